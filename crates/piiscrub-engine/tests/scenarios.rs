//! End-to-end document scenarios against mock classifiers

mod common;

use common::{assert_close, test_config, FailingClassifier, MockClassifier, PageBuilder};
use piiscrub_core::{
    BBox, CompletionStatus, DegradeReason, DocumentLayout, Error, PiiType, PipelineWarning,
};
use piiscrub_detectors::SemanticClassifier;
use piiscrub_engine::{EngineConfig, RedactionEngine};
use std::sync::Arc;
use std::time::Duration;

fn engine_with(config: EngineConfig, classifier: Arc<dyn SemanticClassifier>) -> RedactionEngine {
    RedactionEngine::new(config, Some(classifier)).unwrap()
}

fn regex_only_engine() -> RedactionEngine {
    RedactionEngine::new(test_config(), None).unwrap()
}

fn contact_page() -> DocumentLayout {
    DocumentLayout::new(vec![PageBuilder::new(1)
        .fragment("Contact: ", BBox::new(0.0, 0.0, 45.0, 10.0))
        .fragment("Jane", BBox::new(45.0, 0.0, 65.0, 10.0))
        .fragment(" Smith", BBox::new(65.0, 0.0, 95.0, 10.0))
        .fragment(" for details", BBox::new(95.0, 0.0, 155.0, 10.0))
        .build()])
}

#[tokio::test]
async fn test_email_split_across_adjacent_fragments() {
    let document = DocumentLayout::new(vec![PageBuilder::new(1)
        .fragment("john.doe", BBox::new(10.0, 10.0, 50.0, 20.0))
        .fragment("@example.com", BBox::new(50.0, 10.0, 110.0, 20.0))
        .build()]);

    let outcome = regex_only_engine().process(&document).await.unwrap();

    let regions = outcome.regions.regions_for(1);
    assert_eq!(regions.len(), 1);
    assert_close(regions[0].bbox, BBox::new(10.0, 10.0, 110.0, 20.0));
    assert!(regions[0].entity_types.contains(&PiiType::Email));
    assert_eq!(outcome.status(), CompletionStatus::Complete);
    assert!(outcome.report.warnings.contains(&PipelineWarning::ClassifierUnavailable {
        page: None,
        reason: DegradeReason::NotConfigured,
    }));
}

#[tokio::test]
async fn test_discovered_name_located_by_search() {
    let classifier = Arc::new(MockClassifier::new().with_discovery("full_name", "Jane Smith"));
    let engine = engine_with(test_config(), classifier.clone());

    let outcome = engine.process(&contact_page()).await.unwrap();

    let regions = outcome.regions.regions_for(1);
    assert_eq!(regions.len(), 1);
    assert_close(regions[0].bbox, BBox::new(45.0, 0.0, 95.0, 10.0));
    assert!(regions[0].entity_types.contains(&PiiType::Name));
    assert_eq!(classifier.call_count(), 1);
    assert!(outcome.report.unlocated.is_empty());
    assert!(outcome.report.degraded_pages().is_empty());
}

#[tokio::test]
async fn test_name_with_out_of_order_fragments_is_redacted_whole() {
    // Extraction order: "Name:", "Smith", "Jane"; visually "Name: Jane Smith"
    let document = DocumentLayout::new(vec![PageBuilder::new(1)
        .fragment("Name:", BBox::new(0.0, 0.0, 30.0, 10.0))
        .fragment("Smith", BBox::new(70.0, 0.0, 100.0, 10.0))
        .fragment("Jane", BBox::new(40.0, 0.0, 64.0, 10.0))
        .build()]);
    let classifier = Arc::new(MockClassifier::new().with_discovery("full_name", "Jane Smith"));
    let engine = engine_with(test_config(), classifier);

    let outcome = engine.process(&document).await.unwrap();

    let regions = outcome.regions.regions_for(1);
    assert_eq!(regions.len(), 1);
    assert_close(regions[0].bbox, BBox::new(40.0, 0.0, 100.0, 10.0));
    assert!(regions[0].entity_types.contains(&PiiType::Name));
    assert!(outcome.report.unlocated.is_empty());
    assert_eq!(outcome.status(), CompletionStatus::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_on_one_page_degrades_only_that_page() {
    let pages = (1..=5)
        .map(|p| {
            PageBuilder::new(p)
                .words(&format!("Contact user{}@example.com today", p))
                .build()
        })
        .collect();
    let document = DocumentLayout::new(pages);
    let classifier = Arc::new(MockClassifier::new().with_slow_page(3, Duration::from_secs(5)));
    let engine = engine_with(test_config(), classifier.clone());

    let outcome = engine.process(&document).await.unwrap();

    assert_eq!(outcome.status(), CompletionStatus::Complete);
    assert_eq!(outcome.report.degraded_pages(), vec![3]);
    assert!(outcome.report.warnings.contains(&PipelineWarning::ClassifierUnavailable {
        page: Some(3),
        reason: DegradeReason::Timeout,
    }));
    // Regex-only fallback still redacts the email on the degraded page
    assert_eq!(outcome.regions.pages.len(), 5);
    assert_eq!(outcome.regions.regions_for(3).len(), 1);

    let metrics = &outcome.report.metrics;
    assert_eq!(metrics.pages_processed, 5);
    assert_eq!(metrics.pages_degraded, 1);
    assert_eq!(classifier.call_count(), 5);
    assert_eq!(outcome.report.audit.events_of("page_degraded").count(), 1);
    assert!(outcome.report.audit.verify());
}

#[tokio::test]
async fn test_failed_checksum_rejected_by_classifier_yields_nothing() {
    let document = DocumentLayout::new(vec![PageBuilder::new(1)
        .words("Card number 4539 1488 0343 6468 on file")
        .build()]);
    let engine = engine_with(test_config(), Arc::new(MockClassifier::new()));

    let outcome = engine.process(&document).await.unwrap();

    assert!(outcome.regions.is_empty());
    assert!(outcome.report.unlocated.is_empty());
    assert!(outcome.report.metrics.candidates >= 1);
    assert_eq!(outcome.report.metrics.entities, 0);
}

#[tokio::test]
async fn test_failed_checksum_is_not_promoted_without_classifier() {
    let document = DocumentLayout::new(vec![PageBuilder::new(1)
        .words("Card number 4539 1488 0343 6468 on file")
        .newline()
        .words("Backup card 4111 1111 1111 1111 expires soon")
        .build()]);

    let outcome = regex_only_engine().process(&document).await.unwrap();

    let regions = outcome.regions.regions_for(1);
    assert_eq!(regions.len(), 1);
    assert!(regions[0].entity_types.contains(&PiiType::CreditCard));
    // Only the second line carries a region
    assert!(regions[0].bbox.y0 > 100.0);
}

#[tokio::test]
async fn test_absent_entity_is_reported_unlocated() {
    let document = DocumentLayout::new(vec![PageBuilder::new(1)
        .words("Invoice for your order attached")
        .build()]);
    let classifier = Arc::new(MockClassifier::new().with_discovery("person", "Maximilian Oberhauser"));
    let engine = engine_with(test_config(), classifier);

    let outcome = engine.process(&document).await.unwrap();

    assert!(outcome.regions.is_empty());
    assert_eq!(outcome.status(), CompletionStatus::CompleteWithUnlocated);
    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(outcome.report.unlocated.len(), 1);
    assert_eq!(outcome.report.unlocated[0].text, "Maximilian Oberhauser");
    assert_eq!(outcome.report.unlocated[0].entity_type, PiiType::Name);
    assert_eq!(outcome.report.audit.events_of("entity_unlocated").count(), 1);
}

#[tokio::test]
async fn test_identical_input_yields_identical_regions() {
    let classifier = Arc::new(MockClassifier::new().with_discovery("full_name", "Jane Smith"));
    let engine = engine_with(test_config(), classifier);
    let document = contact_page();

    let first = engine.process(&document).await.unwrap();
    let second = engine.process(&document).await.unwrap();

    assert_eq!(first.regions, second.regions);
    assert_eq!(first.report.unlocated, second.report.unlocated);
}

#[tokio::test]
async fn test_regions_never_merge_across_pages() {
    let page = |n| {
        PageBuilder::new(n)
            .words("Write to jane.doe@example.com please")
            .build()
    };
    let document = DocumentLayout::new(vec![page(1), page(2)]);

    let outcome = regex_only_engine().process(&document).await.unwrap();

    let rows = outcome.regions.flatten();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].page, 1);
    assert_eq!(rows[1].page, 2);
    assert_eq!(rows[0].bbox, rows[1].bbox);
}

#[tokio::test]
async fn test_document_without_text_is_fatal() {
    let document = DocumentLayout::new(vec![
        PageBuilder::new(1)
            .fragment("   ", BBox::new(0.0, 0.0, 10.0, 10.0))
            .build(),
        PageBuilder::new(2).build(),
    ]);

    let err = regex_only_engine().process(&document).await.unwrap_err();
    assert!(matches!(err, Error::NoExtractableText));

    let err = regex_only_engine()
        .process(&DocumentLayout::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoExtractableText));
}

#[tokio::test]
async fn test_entity_texts_propagate_to_other_pages() {
    let document = DocumentLayout::new(vec![
        PageBuilder::new(1).words("Patient Jane Smith admitted").build(),
        PageBuilder::new(2).words("Discharged Jane Smith home").build(),
    ]);
    let classifier = || Arc::new(MockClassifier::new().with_discovery_on(1, "name", "Jane Smith"));

    let outcome = engine_with(test_config(), classifier())
        .process(&document)
        .await
        .unwrap();
    assert_eq!(outcome.regions.regions_for(1).len(), 1);
    assert_eq!(outcome.regions.regions_for(2).len(), 1);

    let mut config = test_config();
    config.locator.propagate_across_pages = false;
    let outcome = engine_with(config, classifier()).process(&document).await.unwrap();
    assert_eq!(outcome.regions.regions_for(1).len(), 1);
    assert!(outcome.regions.regions_for(2).is_empty());
}

#[tokio::test]
async fn test_failing_classifier_degrades_every_page() {
    let document = DocumentLayout::new(vec![
        PageBuilder::new(1).words("Mail jane.doe@example.com now").build(),
        PageBuilder::new(2).words("Nothing sensitive here").build(),
    ]);
    let engine = engine_with(test_config(), Arc::new(FailingClassifier));

    let outcome = engine.process(&document).await.unwrap();

    assert_eq!(outcome.report.degraded_pages(), vec![1, 2]);
    assert!(outcome.report.warnings.contains(&PipelineWarning::ClassifierUnavailable {
        page: Some(1),
        reason: DegradeReason::Error("classifier error: connection refused".to_string()),
    }));
    assert_eq!(outcome.regions.regions_for(1).len(), 1);
}

#[tokio::test]
async fn test_oversized_page_is_not_sent() {
    let mut config = test_config();
    config.classifier.max_request_chars = 10;
    let classifier = Arc::new(MockClassifier::new());
    let engine = engine_with(config, classifier.clone());
    let document = DocumentLayout::new(vec![PageBuilder::new(1)
        .words("Write to jane.doe@example.com please")
        .build()]);

    let outcome = engine.process(&document).await.unwrap();

    assert_eq!(classifier.call_count(), 0);
    assert!(matches!(
        outcome.report.warnings.iter().find(|w| matches!(w, PipelineWarning::ClassifierUnavailable { .. })),
        Some(PipelineWarning::ClassifierUnavailable {
            page: Some(1),
            reason: DegradeReason::PayloadTooLarge { limit: 10, .. },
        })
    ));
    assert_eq!(outcome.regions.region_count(), 1);
}

#[tokio::test]
async fn test_malformed_fragment_is_reported_not_fatal() {
    let document = DocumentLayout::new(vec![PageBuilder::new(1)
        .words("Mail jane.doe@example.com now")
        .fragment("ghost", BBox::new(300.0, 100.0, 300.0, 100.0))
        .build()]);

    let outcome = regex_only_engine().process(&document).await.unwrap();

    assert!(outcome
        .report
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::MalformedFragment { page: 1, .. })));
    assert_eq!(outcome.regions.region_count(), 1);
}

#[tokio::test]
async fn test_language_selected_once_for_document() {
    let document = DocumentLayout::new(vec![
        PageBuilder::new(1)
            .words("Please find the invoice for your order attached.")
            .newline()
            .words("The payment is due within thirty days and will be processed from your account.")
            .build(),
        PageBuilder::new(2).words("Call (555) 123-4567 with questions").build(),
    ]);

    let outcome = regex_only_engine().process(&document).await.unwrap();

    assert_eq!(outcome.report.language.as_deref(), Some("en"));
    let selected: Vec<_> = outcome.report.audit.events_of("language_selected").collect();
    assert_eq!(selected.len(), 1);
    // The US phone pattern only exists in the English set
    assert!(outcome
        .regions
        .regions_for(2)
        .iter()
        .any(|r| r.entity_types.contains(&PiiType::Phone)));
}

#[tokio::test]
async fn test_report_serializes() {
    let outcome = regex_only_engine().process(&contact_page()).await.unwrap();

    let json = outcome.report.to_json().unwrap();
    assert!(json.contains("\"status\": \"complete\""));
    assert!(json.contains("language_selected"));

    let regions = outcome.regions.to_json().unwrap();
    assert!(regions.contains("\"pages\""));
}
