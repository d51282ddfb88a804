//! Hash-chained audit trail of a redaction run

use chrono::{DateTime, Utc};
use piiscrub_core::{DegradeReason, Region, UnlocatedEntity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Audit trail with hash-chained events for tamper detection
///
/// Events never carry PII text; entity texts and region lists are recorded
/// as SHA-256 digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    run_id: Uuid,
    events: Vec<AuditEvent>,
    chain_hash: Option<String>,
}

impl AuditTrail {
    /// Create a new audit trail with a fresh run id
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            events: Vec::new(),
            chain_hash: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Add an event to the audit trail
    pub fn add_event(&mut self, event: AuditEvent) {
        let mut event = event;
        event.previous_hash = self.chain_hash.clone();

        let hash = compute_hash(&event);
        event.hash = Some(hash.clone());

        self.chain_hash = Some(hash);
        self.events.push(event);
    }

    /// Verify the integrity of the audit trail
    pub fn verify(&self) -> bool {
        let mut prev_hash: Option<String> = None;

        for event in &self.events {
            if event.previous_hash != prev_hash {
                return false;
            }
            if event.hash.as_deref() != Some(compute_hash(event).as_str()) {
                return false;
            }
            prev_hash = event.hash.clone();
        }

        prev_hash == self.chain_hash
    }

    /// Get all events
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    /// Events of one type, in insertion order
    pub fn events_of<'a>(&'a self, event_type: &'a str) -> impl Iterator<Item = &'a AuditEvent> + 'a {
        self.events.iter().filter(move |e| e.event_type == event_type)
    }

    /// Record the document language decision
    pub fn language_selected(&mut self, language: Option<&str>, detected: bool) {
        let severity = if language.is_some() {
            AuditSeverity::Info
        } else {
            AuditSeverity::Warning
        };
        self.add_event(
            AuditEvent::new("language_selected")
                .with_data(serde_json::json!({
                    "language": language,
                    "detected": detected,
                }))
                .with_severity(severity),
        );
    }

    /// Record a page that fell back to regex-only detection
    pub fn page_degraded(&mut self, page: u32, reason: &DegradeReason) {
        self.add_event(
            AuditEvent::new("page_degraded")
                .with_page(page)
                .with_data(reason)
                .with_severity(AuditSeverity::Warning),
        );
    }

    /// Record an entity that will not be redacted
    pub fn entity_unlocated(&mut self, entity: &UnlocatedEntity) {
        self.add_event(
            AuditEvent::new("entity_unlocated")
                .with_page(entity.page)
                .with_data(serde_json::json!({
                    "type": entity.entity_type,
                    "text_sha256": digest(entity.text.as_bytes()),
                    "reason": entity.reason,
                }))
                .with_severity(AuditSeverity::High),
        );
    }

    /// Record the final region list of a page
    pub fn regions_emitted(&mut self, page: u32, regions: &[Region]) {
        let encoded = serde_json::to_vec(regions).unwrap_or_default();
        self.add_event(
            AuditEvent::new("regions_emitted")
                .with_page(page)
                .with_data(serde_json::json!({
                    "count": regions.len(),
                    "regions_sha256": digest(&encoded),
                })),
        );
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn compute_hash(event: &AuditEvent) -> String {
    let mut hasher = Sha256::new();

    hasher.update(event.event_type.as_bytes());
    if let Some(page) = event.page {
        hasher.update(page.to_be_bytes());
    }
    if let Some(ref data) = event.data {
        hasher.update(data.as_bytes());
    }
    hasher.update(event.timestamp.to_rfc3339().as_bytes());
    if let Some(ref prev) = event.previous_hash {
        hasher.update(prev.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

/// A single audit event in the trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event type/category
    pub event_type: String,

    /// Page the event concerns, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Event data (JSON serialized)
    pub data: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Hash of this event
    pub hash: Option<String>,

    /// Hash of previous event (for chaining)
    pub previous_hash: Option<String>,

    pub severity: AuditSeverity,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            page: None,
            data: None,
            timestamp: Utc::now(),
            hash: None,
            previous_hash: None,
            severity: AuditSeverity::Info,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set event data
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_string(&data).ok();
        self
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;
    use piiscrub_core::{BBox, PiiType};

    #[test]
    fn test_audit_trail() {
        let mut trail = AuditTrail::new();

        trail.language_selected(Some("de"), true);
        trail.page_degraded(3, &DegradeReason::Timeout);
        trail.regions_emitted(
            1,
            &[Region::new(1, BBox::new(0.0, 0.0, 10.0, 10.0), PiiType::Email)],
        );

        assert!(trail.verify());
        assert_eq!(trail.events().len(), 3);
        assert_eq!(trail.events_of("page_degraded").count(), 1);
        assert_eq!(trail.events()[1].page, Some(3));
    }

    #[test]
    fn test_tamper_detection() {
        let mut trail = AuditTrail::new();

        trail.add_event(AuditEvent::new("event1"));
        trail.add_event(AuditEvent::new("event2"));

        trail.events[0].event_type = "tampered".to_string();

        assert!(!trail.verify());
    }

    #[test]
    fn test_dropped_tail_is_detected() {
        let mut trail = AuditTrail::new();
        trail.add_event(AuditEvent::new("event1"));
        trail.add_event(AuditEvent::new("event2"));

        trail.events.pop();

        assert!(!trail.verify());
    }

    #[test]
    fn test_unlocated_text_is_not_recorded() {
        let mut trail = AuditTrail::new();
        trail.entity_unlocated(&UnlocatedEntity {
            page: 2,
            entity_type: PiiType::Name,
            text: "Jane Smith".to_string(),
            reason: "no window within threshold".to_string(),
        });

        let data = trail.events()[0].data.clone().unwrap();
        assert!(!data.contains("Jane"));
        assert!(data.contains("text_sha256"));
        assert_eq!(trail.events()[0].severity, AuditSeverity::High);
    }

    #[test]
    fn test_region_digest_is_stable() {
        let regions = vec![Region::new(1, BBox::new(0.0, 0.0, 5.0, 5.0), PiiType::Phone)];
        let mut a = AuditTrail::new();
        let mut b = AuditTrail::new();
        a.regions_emitted(1, &regions);
        b.regions_emitted(1, &regions);
        assert_eq!(a.events()[0].data, b.events()[0].data);
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn test_round_trip_still_verifies() {
        let mut trail = AuditTrail::new();
        trail.language_selected(None, false);
        trail.page_degraded(1, &DegradeReason::NotConfigured);

        let json = serde_json::to_string(&trail).unwrap();
        let back: AuditTrail = serde_json::from_str(&json).unwrap();
        assert!(back.verify());
        assert_eq!(back.run_id(), trail.run_id());
    }
}
