//! Semantic reconciler: merges classifier opinions with regex candidates
//!
//! The classifier call is fallible and slow. Any failure (timeout, error,
//! oversized page, no classifier) degrades that page to regex-only
//! semantics instead of failing the document.

use crate::classifier::{ClassifierRequest, ClassifierResponse, SemanticClassifier};
use crate::config::ClassifierSettings;
use piiscrub_core::{Candidate, DegradeReason, Entity, PiiType};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How a page's entity set was produced
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The classifier answered and its opinions were merged
    Reconciled,
    /// Regex-only fallback
    Degraded(DegradeReason),
}

impl ReconcileOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Authoritative entities for one page
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub entities: Vec<Entity>,
    pub outcome: ReconcileOutcome,
    /// Round-trip time of the classifier call, when one was made
    pub latency: Option<Duration>,
}

/// Packages page context for the classifier and merges its response
pub struct SemanticReconciler {
    classifier: Option<Arc<dyn SemanticClassifier>>,
    timeout: Duration,
    max_request_chars: usize,
}

impl SemanticReconciler {
    pub fn new(classifier: Option<Arc<dyn SemanticClassifier>>, settings: &ClassifierSettings) -> Self {
        Self {
            classifier,
            timeout: settings.timeout(),
            max_request_chars: settings.max_request_chars,
        }
    }

    /// Reconciler that never calls out
    pub fn regex_only() -> Self {
        Self::new(None, &ClassifierSettings::default())
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Produce the entity set for one page
    pub async fn reconcile(
        &self,
        page: u32,
        page_text: &str,
        candidates: &[Candidate],
        language: Option<&str>,
    ) -> Reconciliation {
        let classifier = match &self.classifier {
            Some(c) => c,
            None => return degraded(page, candidates, DegradeReason::NotConfigured, None),
        };

        let chars = page_text.chars().count();
        if chars > self.max_request_chars {
            warn!(
                page,
                chars,
                limit = self.max_request_chars,
                "Page text exceeds classifier request limit, using regex-only"
            );
            return degraded(
                page,
                candidates,
                DegradeReason::PayloadTooLarge {
                    chars,
                    limit: self.max_request_chars,
                },
                None,
            );
        }

        let request = ClassifierRequest {
            page,
            page_text: page_text.to_string(),
            candidates: candidates.to_vec(),
            language: language.map(str::to_string),
        };

        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, classifier.classify(&request)).await;
        let latency = started.elapsed();

        match result {
            Ok(Ok(response)) => {
                let entities = merge(page, candidates, &response);
                debug!(
                    page,
                    classifier = classifier.name(),
                    candidates = candidates.len(),
                    entities = entities.len(),
                    latency_ms = latency.as_millis() as u64,
                    "Page reconciled"
                );
                Reconciliation {
                    entities,
                    outcome: ReconcileOutcome::Reconciled,
                    latency: Some(latency),
                }
            }
            Ok(Err(e)) => {
                warn!(page, error = %e, "Classifier call failed, using regex-only");
                degraded(page, candidates, DegradeReason::Error(e.to_string()), Some(latency))
            }
            Err(_) => {
                warn!(
                    page,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Classifier call timed out, using regex-only"
                );
                degraded(page, candidates, DegradeReason::Timeout, Some(latency))
            }
        }
    }
}

fn degraded(
    page: u32,
    candidates: &[Candidate],
    reason: DegradeReason,
    latency: Option<Duration>,
) -> Reconciliation {
    Reconciliation {
        entities: regex_only_entities(page, candidates),
        outcome: ReconcileOutcome::Degraded(reason),
        latency,
    }
}

/// Regex-only semantics: every valid candidate becomes an anchored entity
pub fn regex_only_entities(page: u32, candidates: &[Candidate]) -> Vec<Entity> {
    dedup(
        candidates
            .iter()
            .filter(|c| c.valid)
            .map(|c| Entity::anchored(c.pii_type, c.text.clone(), page, c.span()))
            .collect(),
    )
}

/// Merge a classifier response with the page's candidates.
///
/// Rejection wins over confirmation. Candidates the classifier did not
/// mention keep regex-only semantics. Discoveries become unanchored entities.
pub fn merge(page: u32, candidates: &[Candidate], response: &ClassifierResponse) -> Vec<Entity> {
    let rejected: HashSet<usize> = response.rejected.iter().copied().collect();
    let mut confirmed: HashMap<usize, Option<&str>> = HashMap::new();
    for c in &response.confirmed {
        confirmed.entry(c.id).or_insert(c.pii_type.as_deref());
    }

    let mut entities = Vec::with_capacity(candidates.len() + response.discovered.len());

    for candidate in candidates {
        if rejected.contains(&candidate.id) {
            continue;
        }
        let pii_type = match confirmed.get(&candidate.id) {
            Some(label) => refine_type(candidate.pii_type, *label),
            None if candidate.valid => candidate.pii_type,
            None => continue,
        };
        entities.push(Entity::anchored(
            pii_type,
            candidate.text.clone(),
            page,
            candidate.span(),
        ));
    }

    for id in confirmed.keys().filter(|id| !candidates.iter().any(|c| c.id == **id)) {
        debug!(page, id, "Classifier confirmed an unknown candidate id");
    }

    for discovery in &response.discovered {
        let text = discovery.text.trim();
        if normalize_key(text).is_empty() {
            continue;
        }
        entities.push(Entity::unanchored(
            PiiType::from_label(&discovery.pii_type),
            text,
            page,
        ));
    }

    dedup(entities)
}

/// A classifier label overrides the pattern type unless it is unrecognised
fn refine_type(pattern_type: PiiType, label: Option<&str>) -> PiiType {
    match label.map(PiiType::from_label) {
        Some(PiiType::Other) | None => pattern_type,
        Some(refined) => refined,
    }
}

/// Lowercase with whitespace runs collapsed to single spaces
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop entities with the same `(type, normalized text, page, span_hint)`, keeping the first
fn dedup(entities: Vec<Entity>) -> Vec<Entity> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|e| seen.insert((e.pii_type, normalize_key(&e.text), e.page, e.span_hint)))
        .collect()
}
