//! piiscrub Engine
//!
//! Runs a whole document through detection and location:
//! language selection once per document, one worker per page (matcher,
//! semantic reconciliation with a bounded timeout, fragment location),
//! cross-page propagation, and final region set assembly.

pub mod config;
pub mod outcome;
pub mod pipeline;
pub mod propagation;

pub use config::{EngineConfig, ExecutionConfig};
pub use outcome::{RedactionOutcome, RunReport};
pub use pipeline::RedactionEngine;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::outcome::{RedactionOutcome, RunReport};
    pub use crate::pipeline::RedactionEngine;
    pub use piiscrub_core::prelude::*;
    pub use piiscrub_locator::RedactionRegionSet;
}
