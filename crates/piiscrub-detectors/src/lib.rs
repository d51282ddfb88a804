//! piiscrub Detectors
//!
//! Everything that decides *what* on a page is PII:
//! - Pattern registry with per-language structural patterns and checksum validators
//! - Language adapter that picks the pattern set once per document
//! - Candidate matcher producing offset-tagged candidates
//! - Semantic classifier contract, an OpenAI-compatible backend, and the
//!   reconciler that merges classifier opinions with regex candidates
//!
//! Everything here is read-only after construction and shared across page workers.

pub mod classifier;
pub mod config;
pub mod language;
pub mod matcher;
pub mod openai;
pub mod patterns;
pub mod reconciler;
pub mod validators;

pub use classifier::{
    ClassifierRequest, ClassifierResponse, ConfirmedCandidate, Discovery, SemanticClassifier,
};
pub use config::{ClassifierSettings, CustomPatternSpec, LanguageConfig, MatcherConfig};
pub use language::{
    ActiveProfile, DateOrder, DetectionFailure, Language, LanguageAdapter, LanguageDetector,
    LanguageProfile,
};
pub use matcher::CandidateMatcher;
pub use openai::{parse_classifier_reply, OpenAiClassifier};
pub use patterns::{Pattern, PatternRegistry, PatternSet, PatternSpec};
pub use reconciler::{ReconcileOutcome, Reconciliation, SemanticReconciler};
pub use validators::Validator;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassifierRequest, ClassifierResponse, SemanticClassifier};
    pub use crate::language::{ActiveProfile, Language, LanguageAdapter};
    pub use crate::matcher::CandidateMatcher;
    pub use crate::patterns::PatternRegistry;
    pub use crate::reconciler::{ReconcileOutcome, SemanticReconciler};
}
