//! Semantic classifier contract

use async_trait::async_trait;
use piiscrub_core::{Candidate, Result};
use serde::{Deserialize, Serialize};

/// Trait for external semantic classifiers.
///
/// Implementations are called concurrently from page workers and must be
/// safe to share across tasks.
#[async_trait]
pub trait SemanticClassifier: Send + Sync {
    /// Validate the page's candidates and discover contextual PII
    async fn classify(&self, request: &ClassifierRequest) -> Result<ClassifierResponse>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// One page's worth of context sent to the classifier
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierRequest {
    pub page: u32,

    pub page_text: String,

    pub candidates: Vec<Candidate>,

    /// Language code, or `None` when detection failed
    pub language: Option<String>,
}

/// Structured classifier answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResponse {
    #[serde(default)]
    pub confirmed: Vec<ConfirmedCandidate>,

    /// Ids of candidates that are not PII
    #[serde(default)]
    pub rejected: Vec<usize>,

    #[serde(default)]
    pub discovered: Vec<Discovery>,
}

impl ClassifierResponse {
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.rejected.is_empty() && self.discovered.is_empty()
    }
}

/// A candidate the classifier agrees is PII, optionally with a refined type label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfirmedRepr")]
pub struct ConfirmedCandidate {
    pub id: usize,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub pii_type: Option<String>,
}

impl ConfirmedCandidate {
    pub fn new(id: usize) -> Self {
        Self { id, pii_type: None }
    }

    pub fn with_type(id: usize, label: impl Into<String>) -> Self {
        Self {
            id,
            pii_type: Some(label.into()),
        }
    }
}

/// Classifiers answer either with bare ids or with `{id, type}` objects
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfirmedRepr {
    Id(usize),
    Full {
        id: usize,
        #[serde(rename = "type", default)]
        pii_type: Option<String>,
    },
}

impl From<ConfirmedRepr> for ConfirmedCandidate {
    fn from(repr: ConfirmedRepr) -> Self {
        match repr {
            ConfirmedRepr::Id(id) => Self::new(id),
            ConfirmedRepr::Full { id, pii_type } => Self { id, pii_type },
        }
    }
}

/// Contextual PII found by the classifier without extraction offsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    /// Free-form type label, mapped onto a PII category during reconciliation
    #[serde(rename = "type")]
    pub pii_type: String,

    pub text: String,

    /// Human-readable hint such as "header" or "line 3"; never used as an offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approx_location: Option<String>,
}

impl Discovery {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            pii_type: label.into(),
            text: text.into(),
            approx_location: None,
        }
    }
}
