use thiserror::Error;

/// Top-level error type for the Lexis system.
///
/// Per-word failures during ingestion (`RateLimited`, `Provider`) are
/// contained by the pipeline. Store-level failures (`CorruptStore`,
/// `DimensionMismatch`) are surfaced to the caller as hard failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LexisError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt embedding store: {0}")]
    CorruptStore(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LexisError {
    /// True for conditions that clear up on their own (back off, then move on).
    pub fn is_transient(&self) -> bool {
        matches!(self, LexisError::RateLimited)
    }
}

impl From<toml::de::Error> for LexisError {
    fn from(err: toml::de::Error) -> Self {
        LexisError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LexisError {
    fn from(err: toml::ser::Error) -> Self {
        LexisError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LexisError {
    fn from(err: serde_json::Error) -> Self {
        LexisError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Lexis operations.
pub type Result<T> = std::result::Result<T, LexisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases: Vec<(LexisError, &str)> = vec![
            (
                LexisError::DimensionMismatch {
                    expected: 3,
                    actual: 2,
                },
                "Dimension mismatch: expected 3, got 2",
            ),
            (
                LexisError::CorruptStore("expected array".to_string()),
                "Corrupt embedding store: expected array",
            ),
            (LexisError::RateLimited, "Rate limit exceeded"),
            (
                LexisError::Provider("bad gateway".to_string()),
                "Embedding provider error: bad gateway",
            ),
            (
                LexisError::MissingInput("empty word list".to_string()),
                "Missing input: empty word list",
            ),
            (
                LexisError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_only_rate_limit_is_transient() {
        assert!(LexisError::RateLimited.is_transient());
        assert!(!LexisError::Provider("x".into()).is_transient());
        assert!(!LexisError::CorruptStore("x".into()).is_transient());
        assert!(!LexisError::MissingInput("x".into()).is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LexisError = io_err.into();
        assert!(matches!(err, LexisError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: LexisError = err.unwrap_err().into();
        assert!(matches!(err, LexisError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: LexisError = err.unwrap_err().into();
        assert!(matches!(err, LexisError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
