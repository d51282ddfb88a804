//! Non-fatal run events: warnings, unlocated entities, completion status

use crate::types::PiiType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a page fell back to regex-only detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradeReason {
    /// The classifier did not answer within the configured timeout
    Timeout,
    /// The classifier answered with an error (network, auth, malformed response)
    Error(String),
    /// Page text exceeded the request size limit
    PayloadTooLarge { chars: usize, limit: usize },
    /// No classifier is configured for this run
    NotConfigured,
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Error(e) => write!(f, "error: {}", e),
            Self::PayloadTooLarge { chars, limit } => {
                write!(f, "payload_too_large ({} > {} chars)", chars, limit)
            }
            Self::NotConfigured => write!(f, "not_configured"),
        }
    }
}

/// Recoverable events surfaced to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Language could not be determined; the default pattern set was used
    LanguageDetectionFailure { reason: String },

    /// The semantic classifier was unavailable for a page
    ClassifierUnavailable { page: Option<u32>, reason: DegradeReason },

    /// A fragment was skipped for location purposes
    MalformedFragment {
        page: u32,
        order_index: u32,
        reason: String,
    },
}

/// An entity the locator could not place; it will NOT be redacted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlocatedEntity {
    pub page: u32,

    #[serde(rename = "type")]
    pub entity_type: PiiType,

    pub text: String,

    pub reason: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Every entity was placed
    Complete,
    /// The run finished but some entities could not be placed
    CompleteWithUnlocated,
}

impl CompletionStatus {
    pub fn from_unlocated(unlocated: &[UnlocatedEntity]) -> Self {
        if unlocated.is_empty() {
            Self::Complete
        } else {
            Self::CompleteWithUnlocated
        }
    }

    /// Process exit code: non-zero but distinct from failure when PII was left in place
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::CompleteWithUnlocated => 2,
        }
    }
}
