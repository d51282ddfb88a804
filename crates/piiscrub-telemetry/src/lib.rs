//! piiscrub Telemetry
//!
//! Run metrics and audit trail for piiscrub.
//!
//! Provides:
//! - Atomic run counters mirrored to the `metrics` facade
//! - A hash-chained audit trail of the decisions taken during a run

pub mod audit;
pub mod metrics;

pub use audit::{AuditEvent, AuditSeverity, AuditTrail};
pub use metrics::{describe_metrics, MetricsCollector, MetricsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditEvent, AuditTrail};
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
}
