//! piiscrub Core
//!
//! Core types, traits, and utilities shared across piiscrub components.
//!
//! This crate provides:
//! - The extraction data model (fragments, page layouts, bounding boxes)
//! - Normalized page text with its fragment offset map
//! - PII categories, candidates, entities and redaction regions
//! - Error types and non-fatal run reports

pub mod error;
pub mod page_text;
pub mod report;
pub mod types;

pub use error::{Error, Result};
pub use page_text::{FragmentSlot, PageText};
pub use report::{CompletionStatus, DegradeReason, PipelineWarning, UnlocatedEntity};
pub use types::{
    BBox, Candidate, CandidateSource, DocumentLayout, Entity, PageLayout, PiiType, Region, Span,
    TextFragment,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::page_text::PageText;
    pub use crate::report::{CompletionStatus, PipelineWarning, UnlocatedEntity};
    pub use crate::types::{
        BBox, Candidate, CandidateSource, DocumentLayout, Entity, PageLayout, PiiType, Region,
        Span, TextFragment,
    };
}
