//! piiscrub
//!
//! Reads an extracted document layout, detects PII, and writes the
//! redaction region set for the document-rewrite step.
//!
//! Exit codes: `0` every entity placed, `2` finished but some entities
//! could not be placed (they will NOT be redacted), `1` failure.

use anyhow::{Context, Result};
use clap::Parser;
use piiscrub_core::{CompletionStatus, DocumentLayout};
use piiscrub_engine::RedactionEngine;
use std::process::ExitCode;
use tracing::{info, warn};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    let config = cli.load_config()?;
    info!(
        config = ?cli.config,
        forced_language = ?config.language.forced,
        classifier = config.classifier.enabled,
        "Configuration loaded"
    );

    let raw = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read layout {}", cli.input.display()))?;
    let document = DocumentLayout::from_json(&raw)
        .with_context(|| format!("Failed to parse layout {}", cli.input.display()))?;
    info!(pages = document.pages.len(), input = %cli.input.display(), "Layout loaded");

    let engine = RedactionEngine::from_config(config)?;
    let outcome = engine.process(&document).await?;

    let output = cli.output_path();
    std::fs::write(&output, outcome.regions.to_json()?)
        .with_context(|| format!("Failed to write regions to {}", output.display()))?;
    info!(
        output = %output.display(),
        regions = outcome.regions.region_count(),
        "Region set written"
    );

    if let Some(report_path) = &cli.report {
        std::fs::write(report_path, outcome.report.to_json()?)
            .with_context(|| format!("Failed to write report to {}", report_path.display()))?;
        info!(report = %report_path.display(), "Run report written");
    }

    for warning in &outcome.report.warnings {
        warn!(?warning, "Pipeline warning");
    }

    println!(
        "{} region(s) on {} page(s) written to {}",
        outcome.regions.region_count(),
        outcome.regions.pages.len(),
        output.display()
    );

    if outcome.status() == CompletionStatus::CompleteWithUnlocated {
        eprintln!(
            "warning: {} entit{} could not be located and will NOT be redacted",
            outcome.report.unlocated.len(),
            if outcome.report.unlocated.len() == 1 { "y" } else { "ies" }
        );
        for entity in &outcome.report.unlocated {
            eprintln!("  page {}: {} ({})", entity.page, entity.entity_type, entity.reason);
        }
    }

    Ok(ExitCode::from(outcome.exit_code() as u8))
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("piiscrub=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("piiscrub=info"))
    };

    let (json_layer, text_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
