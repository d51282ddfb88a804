//! Document pipeline: scatter pages over workers, gather, assemble
//!
//! Language is selected once per document. Each page then runs
//! independently (matcher, reconciler, locator) against an immutable
//! [`PageContext`] shared through an `Arc`; the only await point inside a
//! worker is the classifier call, which the reconciler bounds with a
//! timeout. Aggregation waits for every page before building the region set.

use crate::config::EngineConfig;
use crate::outcome::{RedactionOutcome, RunReport};
use crate::propagation::propagate;
use piiscrub_core::{
    CompletionStatus, DegradeReason, DocumentLayout, Error, PageText, PipelineWarning, Result,
};
use piiscrub_detectors::{
    ActiveProfile, CandidateMatcher, LanguageAdapter, OpenAiClassifier, PatternRegistry,
    ReconcileOutcome, SemanticClassifier, SemanticReconciler,
};
use piiscrub_locator::{FragmentLocator, PageLocation, PageRegions, RedactionRegionSet};
use piiscrub_telemetry::{AuditTrail, MetricsCollector};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Read-only state shared by every page worker of one document
struct PageContext {
    active: ActiveProfile,
    matcher: Arc<CandidateMatcher>,
    reconciler: Arc<SemanticReconciler>,
    locator: Arc<FragmentLocator>,
    metrics: MetricsCollector,
}

/// What one page worker hands back
struct PageResult {
    page: u32,
    outcome: ReconcileOutcome,
    location: PageLocation,
}

/// The redaction engine
pub struct RedactionEngine {
    config: Arc<EngineConfig>,
    adapter: LanguageAdapter,
    matcher: Arc<CandidateMatcher>,
    reconciler: Arc<SemanticReconciler>,
    locator: Arc<FragmentLocator>,
}

impl RedactionEngine {
    /// Build an engine around an explicit classifier (or none)
    pub fn new(config: EngineConfig, classifier: Option<Arc<dyn SemanticClassifier>>) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(PatternRegistry::with_custom(&config.matcher.custom_patterns)?);
        let adapter = LanguageAdapter::new(registry.clone(), config.language.clone())?;
        let matcher = Arc::new(CandidateMatcher::new(&config.matcher));
        let reconciler = Arc::new(SemanticReconciler::new(classifier, &config.classifier));
        let locator = Arc::new(FragmentLocator::new(config.locator.clone()));

        info!(
            languages = registry.languages().len(),
            classifier = reconciler.has_classifier(),
            max_concurrent_pages = config.engine.max_concurrent_pages,
            "Redaction engine initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            adapter,
            matcher,
            reconciler,
            locator,
        })
    }

    /// Build an engine with the HTTP classifier described by the configuration
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let classifier = OpenAiClassifier::from_settings(&config.classifier)?
            .map(|c| Arc::new(c) as Arc<dyn SemanticClassifier>);
        Self::new(config, classifier)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn has_classifier(&self) -> bool {
        self.reconciler.has_classifier()
    }

    /// Process a whole document.
    ///
    /// Fails only when the document has no extractable text at all; every
    /// other problem is reported in the run report.
    pub async fn process(&self, document: &DocumentLayout) -> Result<RedactionOutcome> {
        if !document.has_text() {
            warn!(pages = document.pages.len(), "Document has no extractable text");
            return Err(Error::NoExtractableText);
        }

        let started = Instant::now();
        let metrics = MetricsCollector::new();
        let mut audit = AuditTrail::new();
        let mut warnings = Vec::new();

        let mut layouts: Vec<_> = document.pages.iter().collect();
        layouts.sort_by_key(|p| p.page);
        let pages: Vec<Arc<PageText>> = layouts
            .into_iter()
            .map(|layout| {
                let (page_text, page_warnings) = PageText::build(layout);
                warnings.extend(page_warnings);
                Arc::new(page_text)
            })
            .collect();

        let sample = self
            .adapter
            .sample(pages.iter().filter(|p| !p.is_blank()).map(|p| p.text()));
        let (active, language_warning) = self.adapter.select(&sample);
        let language = active.language().map(|l| l.code().to_string());
        let detected = language_warning.is_none() && self.config.language.forced.is_none();
        audit.language_selected(language.as_deref(), detected);
        warnings.extend(language_warning);

        info!(
            run_id = %audit.run_id(),
            pages = pages.len(),
            language = active.profile.code(),
            "Processing document"
        );

        let context = Arc::new(PageContext {
            active,
            matcher: self.matcher.clone(),
            reconciler: self.reconciler.clone(),
            locator: self.locator.clone(),
            metrics: metrics.clone(),
        });

        let mut results = self.scatter(context, &pages).await?;
        results.sort_by_key(|r| r.page);

        if !self.reconciler.has_classifier() {
            warnings.push(PipelineWarning::ClassifierUnavailable {
                page: None,
                reason: DegradeReason::NotConfigured,
            });
        } else {
            for result in &results {
                if let ReconcileOutcome::Degraded(reason) = &result.outcome {
                    audit.page_degraded(result.page, reason);
                    warnings.push(PipelineWarning::ClassifierUnavailable {
                        page: Some(result.page),
                        reason: reason.clone(),
                    });
                }
            }
        }

        let mut page_regions: Vec<PageRegions> = Vec::with_capacity(results.len());
        let mut unlocated = Vec::new();
        let mut locations = Vec::with_capacity(results.len());
        for result in results {
            let location = result.location;
            unlocated.extend(location.unlocated.iter().cloned());
            page_regions.push(PageRegions {
                page: location.page,
                regions: location.regions.clone(),
            });
            locations.push(location);
        }

        if self.config.locator.propagate_across_pages {
            page_regions.extend(propagate(&self.locator, &pages, &locations));
        }

        let regions = RedactionRegionSet::from_pages(page_regions, self.config.locator.merge_tolerance);
        for page in &regions.pages {
            audit.regions_emitted(page.page, &page.regions);
        }
        for entity in &unlocated {
            audit.entity_unlocated(entity);
        }
        metrics.record_regions(regions.region_count() as u64);

        let status = CompletionStatus::from_unlocated(&unlocated);
        info!(
            run_id = %audit.run_id(),
            regions = regions.region_count(),
            unlocated = unlocated.len(),
            warnings = warnings.len(),
            ?status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document processed"
        );

        Ok(RedactionOutcome {
            regions,
            report: RunReport {
                language,
                status,
                warnings,
                unlocated,
                metrics: metrics.snapshot(),
                audit,
            },
        })
    }

    /// Run one worker per page, at most `max_concurrent_pages` at a time
    async fn scatter(&self, context: Arc<PageContext>, pages: &[Arc<PageText>]) -> Result<Vec<PageResult>> {
        let semaphore = Arc::new(Semaphore::new(self.config.engine.max_concurrent_pages.max(1)));
        let mut workers = JoinSet::new();

        for page_text in pages {
            let context = context.clone();
            let page_text = page_text.clone();
            let semaphore = semaphore.clone();
            workers.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::internal(format!("page scheduler closed: {}", e)))?;
                Ok::<_, Error>(process_page(&context, &page_text).await)
            });
        }

        let mut results = Vec::with_capacity(pages.len());
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(result) => results.push(result?),
                Err(e) => return Err(Error::internal(format!("page worker failed: {}", e))),
            }
        }
        Ok(results)
    }
}

async fn process_page(context: &PageContext, page_text: &PageText) -> PageResult {
    let page = page_text.page();

    if page_text.is_blank() {
        debug!(page, "Blank page, nothing to detect");
        context.metrics.record_page(false);
        return PageResult {
            page,
            outcome: ReconcileOutcome::Reconciled,
            location: PageLocation {
                page,
                ..PageLocation::default()
            },
        };
    }

    let candidates = context
        .matcher
        .find_candidates(page_text.text(), &context.active);
    context.metrics.record_candidates(candidates.len() as u64);

    let reconciliation = context
        .reconciler
        .reconcile(
            page,
            page_text.text(),
            &candidates,
            context.active.language().map(|l| l.code()),
        )
        .await;
    if let Some(latency) = reconciliation.latency {
        context.metrics.record_classifier_latency(latency);
    }
    context
        .metrics
        .record_entities(reconciliation.entities.len() as u64);

    let location = context.locator.locate_page(page_text, &reconciliation.entities);
    context
        .metrics
        .record_unlocated(location.unlocated.len() as u64);
    context.metrics.record_page(reconciliation.outcome.is_degraded());

    debug!(
        page,
        candidates = candidates.len(),
        entities = reconciliation.entities.len(),
        regions = location.regions.len(),
        unlocated = location.unlocated.len(),
        degraded = reconciliation.outcome.is_degraded(),
        "Page processed"
    );

    PageResult {
        page,
        outcome: reconciliation.outcome,
        location,
    }
}
