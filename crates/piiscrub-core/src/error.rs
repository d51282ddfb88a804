//! Error types for piiscrub

/// Result type alias using piiscrub's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for piiscrub operations
///
/// Only conditions that must stop a run live here. Recoverable events
/// (classifier outages, unlocatable entities, malformed fragments) are
/// reported as [`crate::report::PipelineWarning`] values instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Pattern compilation or registry errors
    #[error("pattern error: {0}")]
    Pattern(String),

    /// Semantic classifier call errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Fragment layout errors that invalidate a whole document
    #[error("layout error: {0}")]
    Layout(String),

    /// The document carries no extractable text on any page
    #[error("document contains no extractable text; refusing to produce an unredacted copy")]
    NoExtractableText,

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration parsing errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new pattern error
    pub fn pattern(msg: impl Into<String>) -> Self {
        Self::Pattern(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new layout error
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is fatal for the whole document
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Classifier(_) | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_errors_are_recoverable() {
        assert!(!Error::classifier("503").is_fatal());
        assert!(!Error::Timeout.is_fatal());
        assert!(Error::NoExtractableText.is_fatal());
        assert!(Error::config("bad").is_fatal());
    }

    #[test]
    fn test_display() {
        let err = Error::pattern("unclosed group");
        assert_eq!(err.to_string(), "pattern error: unclosed group");
    }
}
