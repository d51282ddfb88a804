//! Engine configuration loaded from YAML

use piiscrub_core::{Error, Result};
use piiscrub_detectors::{ClassifierSettings, LanguageConfig, MatcherConfig};
use piiscrub_locator::LocatorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for a redaction run.
///
/// Every section and field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub language: LanguageConfig,

    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub classifier: ClassifierSettings,

    #[serde(default)]
    pub locator: LocatorConfig,

    #[serde(default)]
    pub engine: ExecutionConfig,
}

/// Page worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Upper bound on pages processed at the same time
    #[serde(default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: default_max_concurrent_pages(),
        }
    }
}

fn default_max_concurrent_pages() -> usize {
    num_cpus::get()
}

impl EngineConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject values that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.engine.max_concurrent_pages == 0 {
            return Err(Error::config("engine.max_concurrent_pages must be at least 1"));
        }
        if self.classifier.timeout_ms == 0 {
            return Err(Error::config("classifier.timeout_ms must be positive"));
        }
        let tolerance = self.locator.merge_tolerance;
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(Error::config("locator.merge_tolerance must be non-negative"));
        }
        if let Some((pii_type, ratio)) = self
            .locator
            .max_edit_ratio
            .iter()
            .find(|(_, r)| !(0.0..=1.0).contains(*r))
        {
            return Err(Error::config(format!(
                "locator.max_edit_ratio.{} must be within [0, 1], got {}",
                pii_type, ratio
            )));
        }
        Ok(())
    }
}
