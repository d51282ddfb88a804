//! Locator configuration

use piiscrub_core::PiiType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fragment locator and region assembly settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Extra normalized characters added to each search window
    #[serde(default = "default_window_slack")]
    pub window_slack: usize,

    /// Same-line regions closer than this many points are merged
    #[serde(default = "default_merge_tolerance")]
    pub merge_tolerance: f64,

    /// Edit budget per type as a fraction of the normalized text length
    #[serde(default)]
    pub max_edit_ratio: HashMap<PiiType, f64>,

    /// Minimum length of a comma/semicolon/newline part searched on its own
    #[serde(default = "default_min_part_chars")]
    pub min_part_chars: usize,

    /// Search entity texts found on one page across the other pages
    #[serde(default = "default_true")]
    pub propagate_across_pages: bool,

    /// Texts shorter than this (normalized) are never propagated
    #[serde(default = "default_min_propagation_chars")]
    pub min_propagation_chars: usize,
}

impl LocatorConfig {
    /// Configured ratio for a type, falling back to the built-in one
    pub fn max_edit_ratio_for(&self, pii_type: PiiType) -> f64 {
        self.max_edit_ratio
            .get(&pii_type)
            .copied()
            .unwrap_or_else(|| pii_type.default_max_edit_ratio())
            .clamp(0.0, 1.0)
    }

    /// Number of edits allowed when searching for `target_len` normalized characters
    pub fn allowed_edits(&self, pii_type: PiiType, target_len: usize) -> usize {
        (self.max_edit_ratio_for(pii_type) * target_len as f64).floor() as usize
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            window_slack: default_window_slack(),
            merge_tolerance: default_merge_tolerance(),
            max_edit_ratio: HashMap::new(),
            min_part_chars: default_min_part_chars(),
            propagate_across_pages: true,
            min_propagation_chars: default_min_propagation_chars(),
        }
    }
}

fn default_window_slack() -> usize {
    3
}

fn default_merge_tolerance() -> f64 {
    0.5
}

fn default_min_part_chars() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_min_propagation_chars() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ratios() {
        let config = LocatorConfig::default();
        assert_eq!(config.allowed_edits(PiiType::Email, 16), 0);
        assert_eq!(config.allowed_edits(PiiType::Name, 10), 2);
        assert_eq!(config.allowed_edits(PiiType::Address, 20), 5);
    }

    #[test]
    fn test_yaml_override() {
        let yaml = "max_edit_ratio:\n  name: 0.3\n  phone: 0.0\nwindow_slack: 5\n";
        let config: LocatorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.window_slack, 5);
        assert_eq!(config.allowed_edits(PiiType::Name, 10), 3);
        assert_eq!(config.allowed_edits(PiiType::Phone, 12), 0);
        assert_eq!(config.allowed_edits(PiiType::Address, 20), 5);
        assert!(config.propagate_across_pages);
    }
}
