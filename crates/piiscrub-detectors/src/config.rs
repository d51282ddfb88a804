//! Configuration for detection: language selection, matching and the semantic classifier

use crate::validators::Validator;
use piiscrub_core::PiiType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Language detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Number of leading pages sampled for detection
    #[serde(default = "default_sample_pages")]
    pub sample_pages: usize,

    /// Maximum characters in the detection sample
    #[serde(default = "default_sample_chars")]
    pub sample_chars: usize,

    /// Minimum words in the sample before detection is attempted
    #[serde(default = "default_min_words")]
    pub min_words: usize,

    /// Minimum relative lead of the best language over the runner-up
    #[serde(default = "default_min_margin")]
    pub min_margin: f64,

    /// Language code that bypasses detection
    #[serde(default)]
    pub forced: Option<String>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            sample_pages: default_sample_pages(),
            sample_chars: default_sample_chars(),
            min_words: default_min_words(),
            min_margin: default_min_margin(),
            forced: None,
        }
    }
}

/// Candidate matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Multiplier applied to a pattern's confidence when its validator fails
    #[serde(default = "default_invalid_confidence_factor")]
    pub invalid_confidence_factor: f32,

    /// Patterns extending the built-in registry
    #[serde(default)]
    pub custom_patterns: Vec<CustomPatternSpec>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            invalid_confidence_factor: default_invalid_confidence_factor(),
            custom_patterns: Vec::new(),
        }
    }
}

/// A user-defined pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPatternSpec {
    /// Pattern id; generated when omitted
    #[serde(default)]
    pub id: Option<String>,

    /// Language code, or `default` for every language
    #[serde(default = "default_pattern_language")]
    pub language: String,

    #[serde(rename = "type")]
    pub pii_type: PiiType,

    pub regex: String,

    #[serde(default)]
    pub validator: Option<Validator>,

    #[serde(default = "default_pattern_confidence")]
    pub confidence: f32,
}

/// Semantic classifier backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// OpenAI-compatible chat completions URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pages longer than this are not sent and run regex-only
    #[serde(default = "default_max_request_chars")]
    pub max_request_chars: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl ClassifierSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            max_request_chars: default_max_request_chars(),
            temperature: default_temperature(),
        }
    }
}

fn default_sample_pages() -> usize {
    2
}

fn default_sample_chars() -> usize {
    4000
}

fn default_min_words() -> usize {
    5
}

fn default_min_margin() -> f64 {
    0.15
}

fn default_invalid_confidence_factor() -> f32 {
    0.3
}

fn default_pattern_language() -> String {
    "default".to_string()
}

fn default_pattern_confidence() -> f32 {
    0.8
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_request_chars() -> usize {
    24_000
}

fn default_temperature() -> f32 {
    0.2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: ClassifierSettings = serde_yaml::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout(), Duration::from_secs(30));

        let language: LanguageConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(language.sample_pages, 2);
        assert!(language.forced.is_none());
    }

    #[test]
    fn test_custom_pattern_yaml() {
        let yaml = r#"
invalid_confidence_factor: 0.5
custom_patterns:
  - type: order_id
    regex: '\bORD-\d{6}\b'
  - language: de
    type: tax_id
    regex: '\b\d{11}\b'
    validator: german_tax_id
    confidence: 0.7
"#;
        let config: MatcherConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.invalid_confidence_factor, 0.5);
        assert_eq!(config.custom_patterns.len(), 2);
        assert_eq!(config.custom_patterns[0].language, "default");
        assert_eq!(config.custom_patterns[0].pii_type, PiiType::OrderId);
        assert_eq!(
            config.custom_patterns[1].validator,
            Some(Validator::GermanTaxId)
        );
    }

    #[test]
    fn test_unknown_validator_rejected() {
        let yaml = "custom_patterns:\n  - type: phone\n    regex: 'x'\n    validator: crc32\n";
        assert!(serde_yaml::from_str::<MatcherConfig>(yaml).is_err());
    }
}
