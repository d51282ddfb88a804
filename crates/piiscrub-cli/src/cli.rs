//! Command-line arguments and their effect on the engine configuration

use clap::Parser;
use piiscrub_engine::EngineConfig;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "piiscrub")]
#[command(about = "Locate PII in an extracted document layout and emit redaction regions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Extractor layout JSON (pages of text fragments with bounding boxes)
    pub input: PathBuf,

    /// Configuration file path
    #[arg(short, long, env = "PIISCRUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Region set output path (defaults to `<input stem>_regions.json` next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the run report (warnings, unlocated entities, metrics, audit trail) here
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Force the document language instead of detecting it (en, de, fr, es, nl, it, pt)
    #[arg(short, long, env = "PIISCRUB_LANGUAGE")]
    pub language: Option<String>,

    /// Run regex-only, without the semantic classifier
    #[arg(long)]
    pub no_classifier: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "PIISCRUB_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    /// Load configuration and apply command-line overrides.
    ///
    /// An explicitly named config file must exist; without one the defaults apply.
    pub fn load_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?,
            None => EngineConfig::default(),
        };

        if let Some(language) = &self.language {
            config.language.forced = Some(language.clone());
        }

        if self.no_classifier {
            config.classifier.enabled = false;
        }

        Ok(config)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }
}

/// `<stem>_regions.json` next to the input, suffixed `_1`, `_2`, ... while taken
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let dir = input.parent().unwrap_or_else(|| Path::new(""));

    let candidate = dir.join(format!("{}_regions.json", stem));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(format!("{}_regions_{}.json", stem, n)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
