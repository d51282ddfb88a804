//! Page worker scheduling and configuration loading

mod common;

use common::{test_config, CountingClassifier, PageBuilder};
use piiscrub_core::{BBox, DocumentLayout};
use piiscrub_engine::{EngineConfig, RedactionEngine};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn document(pages: u32) -> DocumentLayout {
    DocumentLayout::new(
        (1..=pages)
            .map(|p| PageBuilder::new(p).words(&format!("Page {} body text", p)).build())
            .collect(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_pages_bounded_by_config() {
    let classifier = Arc::new(CountingClassifier::new(Duration::from_millis(100)));
    let mut config = test_config();
    config.classifier.timeout_ms = 1_000;
    config.engine.max_concurrent_pages = 2;
    let engine = RedactionEngine::new(config, Some(classifier.clone())).unwrap();

    let outcome = engine.process(&document(6)).await.unwrap();

    assert_eq!(classifier.call_count(), 6);
    assert_eq!(classifier.max_in_flight(), 2);
    assert!(outcome.report.degraded_pages().is_empty());
    assert_eq!(outcome.report.metrics.classifier_calls, 6);
}

#[tokio::test(start_paused = true)]
async fn test_pages_run_in_parallel() {
    let classifier = Arc::new(CountingClassifier::new(Duration::from_millis(100)));
    let mut config = test_config();
    config.classifier.timeout_ms = 1_000;
    config.engine.max_concurrent_pages = 6;
    let engine = RedactionEngine::new(config, Some(classifier.clone())).unwrap();

    let started = tokio::time::Instant::now();
    engine.process(&document(6)).await.unwrap();

    assert_eq!(classifier.max_in_flight(), 6);
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn test_blank_pages_skip_the_classifier() {
    let classifier = Arc::new(CountingClassifier::new(Duration::from_millis(1)));
    let engine = RedactionEngine::new(test_config(), Some(classifier.clone())).unwrap();
    let document = DocumentLayout::new(vec![
        PageBuilder::new(1).words("Some words here").build(),
        PageBuilder::new(2)
            .fragment(" ", BBox::new(0.0, 0.0, 5.0, 10.0))
            .build(),
    ]);

    let outcome = engine.process(&document).await.unwrap();

    assert_eq!(classifier.call_count(), 1);
    assert_eq!(outcome.report.metrics.pages_processed, 2);
}

#[test]
fn test_engine_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "classifier:\n  enabled: false\nlocator:\n  merge_tolerance: 2.0\nengine:\n  max_concurrent_pages: 3"
    )
    .unwrap();

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.engine.max_concurrent_pages, 3);

    let engine = RedactionEngine::from_config(config).unwrap();
    assert!(!engine.has_classifier());
    assert_eq!(engine.config().locator.merge_tolerance, 2.0);
}

#[test]
fn test_missing_api_key_disables_classifier() {
    let mut config = EngineConfig::default();
    config.classifier.api_key_env = "PIISCRUB_TEST_UNSET_KEY_7F3A".to_string();

    let engine = RedactionEngine::from_config(config).unwrap();
    assert!(!engine.has_classifier());
}

#[test]
fn test_invalid_custom_pattern_fails_construction() {
    let yaml = "matcher:\n  custom_patterns:\n    - type: order_id\n      regex: '(unclosed'\n";
    let config = EngineConfig::from_yaml(yaml).unwrap();

    assert!(RedactionEngine::new(config, None).is_err());
}

#[test]
fn test_missing_config_file() {
    let err = EngineConfig::from_file("/nonexistent/piiscrub.yaml").unwrap_err();
    assert!(matches!(err, piiscrub_core::Error::Io(_)));
}
