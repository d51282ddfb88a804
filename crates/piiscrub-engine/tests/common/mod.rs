//! Mock classifiers and layout builders shared by the engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use piiscrub_core::{BBox, Candidate, PageLayout, Result, TextFragment};
use piiscrub_detectors::{
    ClassifierRequest, ClassifierResponse, ConfirmedCandidate, Discovery, SemanticClassifier,
};
use piiscrub_engine::EngineConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

/// Confirms valid candidates, rejects invalid ones, returns scripted discoveries
pub struct MockClassifier {
    discoveries: Vec<(Option<u32>, Discovery)>,
    slow_pages: HashMap<u32, Duration>,
    call_count: AtomicU32,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            discoveries: Vec::new(),
            slow_pages: HashMap::new(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Discovery returned for every page
    pub fn with_discovery(mut self, label: &str, text: &str) -> Self {
        self.discoveries.push((None, Discovery::new(label, text)));
        self
    }

    /// Discovery returned only for one page
    pub fn with_discovery_on(mut self, page: u32, label: &str, text: &str) -> Self {
        self.discoveries.push((Some(page), Discovery::new(label, text)));
        self
    }

    /// Delay the answer for one page
    pub fn with_slow_page(mut self, page: u32, latency: Duration) -> Self {
        self.slow_pages.insert(page, latency);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SemanticClassifier for MockClassifier {
    async fn classify(&self, request: &ClassifierRequest) -> Result<ClassifierResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.slow_pages.get(&request.page) {
            tokio::time::sleep(*latency).await;
        }

        let (valid, invalid): (Vec<&Candidate>, Vec<&Candidate>) =
            request.candidates.iter().partition(|c| c.valid);

        Ok(ClassifierResponse {
            confirmed: valid.iter().map(|c| ConfirmedCandidate::new(c.id)).collect(),
            rejected: invalid.iter().map(|c| c.id).collect(),
            discovered: self
                .discoveries
                .iter()
                .filter(|(page, _)| page.map_or(true, |p| p == request.page))
                .map(|(_, d)| d.clone())
                .collect(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Always fails, for testing degradation
pub struct FailingClassifier;

#[async_trait]
impl SemanticClassifier for FailingClassifier {
    async fn classify(&self, _request: &ClassifierRequest) -> Result<ClassifierResponse> {
        Err(piiscrub_core::Error::classifier("connection refused"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Tracks how many calls are in flight at once
pub struct CountingClassifier {
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    call_count: AtomicU32,
}

impl CountingClassifier {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            call_count: AtomicU32::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SemanticClassifier for CountingClassifier {
    async fn classify(&self, _request: &ClassifierRequest) -> Result<ClassifierResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(ClassifierResponse::default())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Lays out words left to right, one line at a time
pub struct PageBuilder {
    page: u32,
    fragments: Vec<TextFragment>,
    x: f64,
    y: f64,
    order: u32,
}

pub const GLYPH_WIDTH: f64 = 6.0;
pub const LINE_HEIGHT: f64 = 12.0;

impl PageBuilder {
    pub fn new(page: u32) -> Self {
        Self {
            page,
            fragments: Vec::new(),
            x: 50.0,
            y: 100.0,
            order: 0,
        }
    }

    /// A word followed by a visible gap
    pub fn word(mut self, text: &str) -> Self {
        let width = text.chars().count() as f64 * GLYPH_WIDTH;
        let bbox = BBox::new(self.x, self.y, self.x + width, self.y + LINE_HEIGHT);
        self = self.fragment(text, bbox);
        self.x += width + GLYPH_WIDTH;
        self
    }

    /// Every word of a sentence
    pub fn words(mut self, sentence: &str) -> Self {
        for word in sentence.split_whitespace() {
            self = self.word(word);
        }
        self
    }

    pub fn newline(mut self) -> Self {
        self.x = 50.0;
        self.y += LINE_HEIGHT * 1.5;
        self
    }

    /// A fragment with an explicit box
    pub fn fragment(mut self, text: &str, bbox: BBox) -> Self {
        self.fragments
            .push(TextFragment::new(text, bbox, self.page, self.order));
        self.order += 1;
        self
    }

    pub fn build(self) -> PageLayout {
        PageLayout::new(self.page, self.fragments)
    }
}

/// Defaults suitable for fast tests
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.classifier.timeout_ms = 200;
    config.engine.max_concurrent_pages = 4;
    config
}

pub fn assert_close(actual: BBox, expected: BBox) {
    let eps = 1e-6;
    assert!(
        (actual.x0 - expected.x0).abs() < eps
            && (actual.y0 - expected.y0).abs() < eps
            && (actual.x1 - expected.x1).abs() < eps
            && (actual.y1 - expected.y1).abs() < eps,
        "{:?} != {:?}",
        actual,
        expected
    );
}
