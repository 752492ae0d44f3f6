use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("counter delta must be non-negative, got {delta} for '{name}'")]
    NegativeCounterDelta { name: String, delta: f64 },

    #[error("taxonomy error: {0}")]
    Taxonomy(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("invalid label: {0}")]
    InvalidLabel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("taxonomy parse error: {0}")]
    TaxonomyParse(#[from] serde_yaml::Error),
}

/// Result type alias for tally operations.
pub type Result<T> = std::result::Result<T, TallyError>;

impl TallyError {
    /// Creates a new taxonomy error
    pub fn taxonomy<S: Into<String>>(msg: S) -> Self {
        Self::Taxonomy(msg.into())
    }

    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new sink error
    pub fn sink<S: Into<String>>(msg: S) -> Self {
        Self::Sink(msg.into())
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Sink(_) | Self::Taxonomy(_) | Self::TaxonomyParse(_) => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::NegativeCounterDelta { .. } | Self::InvalidLabel(_) => "validation",
            Self::Taxonomy(_) | Self::TaxonomyParse(_) => "taxonomy",
            Self::Config(_) => "config",
            Self::Sink(_) => "sink",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TallyError::taxonomy("catalog missing");
        assert_eq!(err.to_string(), "taxonomy error: catalog missing");
        assert_eq!(err.category(), "taxonomy");
    }

    #[test]
    fn test_negative_delta_message() {
        let err = TallyError::NegativeCounterDelta {
            name: "http_requests_total".to_string(),
            delta: -1.0,
        };
        assert_eq!(
            err.to_string(),
            "counter delta must be non-negative, got -1 for 'http_requests_total'"
        );
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(TallyError::sink("collector unreachable").is_recoverable());
        assert!(!TallyError::config("bad flush interval").is_recoverable());
    }
}
