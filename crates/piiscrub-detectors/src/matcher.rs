//! Candidate matcher: runs the active pattern set over page text

use crate::config::MatcherConfig;
use crate::language::ActiveProfile;
use crate::patterns::Pattern;
use piiscrub_core::{Candidate, CandidateSource};
use std::time::Instant;
use tracing::debug;

/// Finds offset-tagged candidate spans in normalized page text
#[derive(Debug, Clone)]
pub struct CandidateMatcher {
    invalid_confidence_factor: f32,
}

impl CandidateMatcher {
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            invalid_confidence_factor: config.invalid_confidence_factor.clamp(0.0, 1.0),
        }
    }

    /// Find all candidates on one page.
    ///
    /// Matches of one pattern never overlap each other; matches of different
    /// patterns may. Candidates failing their validator are kept with
    /// `valid = false` and reduced confidence. The output is sorted by
    /// `(start, end, type)` and ids are positions in that order.
    pub fn find_candidates(&self, text: &str, active: &ActiveProfile) -> Vec<Candidate> {
        let started = Instant::now();
        let mut candidates = Vec::new();

        for pattern in active.patterns.patterns() {
            for mat in pattern.regex.find_iter(text) {
                if let Some(candidate) = self.candidate_from(text, mat.start(), mat.end(), pattern, active)
                {
                    candidates.push(candidate);
                }
            }
        }

        candidates.sort_by(|a, b| {
            (a.start, a.end, a.pii_type)
                .cmp(&(b.start, b.end, b.pii_type))
                .then(b.valid.cmp(&a.valid))
                .then(b.confidence.total_cmp(&a.confidence))
        });
        // Two patterns of the same type hitting the same span yield one candidate
        candidates.dedup_by(|later, earlier| {
            later.start == earlier.start
                && later.end == earlier.end
                && later.pii_type == earlier.pii_type
        });
        for (id, candidate) in candidates.iter_mut().enumerate() {
            candidate.id = id;
        }

        debug!(
            language = active.profile.code(),
            candidates = candidates.len(),
            invalid = candidates.iter().filter(|c| !c.valid).count(),
            latency_us = started.elapsed().as_micros() as u64,
            "Candidate matching complete"
        );

        candidates
    }

    fn candidate_from(
        &self,
        text: &str,
        start: usize,
        end: usize,
        pattern: &Pattern,
        active: &ActiveProfile,
    ) -> Option<Candidate> {
        let raw = &text[start..end];
        let trimmed_start = start + (raw.len() - raw.trim_start().len());
        let trimmed_end = end - (raw.len() - raw.trim_end().len());
        if trimmed_start >= trimmed_end {
            return None;
        }
        let matched = &text[trimmed_start..trimmed_end];

        let valid = pattern
            .validator
            .map_or(true, |validator| validator.validate(matched, &active.profile));
        let confidence = if valid {
            pattern.confidence
        } else {
            pattern.confidence * self.invalid_confidence_factor
        };

        Some(Candidate {
            id: 0,
            pii_type: pattern.pii_type,
            text: matched.to_string(),
            start: trimmed_start,
            end: trimmed_end,
            source: CandidateSource::Regex,
            confidence,
            valid,
        })
    }
}

impl Default for CandidateMatcher {
    fn default() -> Self {
        Self::new(&MatcherConfig::default())
    }
}
