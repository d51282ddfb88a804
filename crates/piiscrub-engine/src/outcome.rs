//! Run outputs: the region set and the report that accompanies it

use piiscrub_core::{CompletionStatus, PipelineWarning, UnlocatedEntity};
use piiscrub_locator::RedactionRegionSet;
use piiscrub_telemetry::{AuditTrail, MetricsSnapshot};
use serde::{Deserialize, Serialize};

/// Everything the caller needs to know about a run besides the regions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Selected language code, `None` when the default pattern set was used
    pub language: Option<String>,

    pub status: CompletionStatus,

    pub warnings: Vec<PipelineWarning>,

    /// Entities that will NOT be redacted
    pub unlocated: Vec<UnlocatedEntity>,

    pub metrics: MetricsSnapshot,

    pub audit: AuditTrail,
}

impl RunReport {
    /// Pages that fell back to regex-only detection
    pub fn degraded_pages(&self) -> Vec<u32> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                PipelineWarning::ClassifierUnavailable { page: Some(p), .. } => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result of processing one document
#[derive(Debug, Clone)]
pub struct RedactionOutcome {
    pub regions: RedactionRegionSet,
    pub report: RunReport,
}

impl RedactionOutcome {
    pub fn status(&self) -> CompletionStatus {
        self.report.status
    }

    pub fn exit_code(&self) -> i32 {
        self.report.status.exit_code()
    }
}
