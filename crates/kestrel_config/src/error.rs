//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `kestrel.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Two settings that cannot be combined were both given.
    #[error("conflicting settings: {0}")]
    Conflict(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            err.to_string(),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_conflict() {
        let err = ConfigError::Conflict("vectors and input_vectors".to_string());
        assert_eq!(err.to_string(), "conflicting settings: vectors and input_vectors");
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("workers must be at least 1".to_string());
        assert_eq!(err.to_string(), "validation error: workers must be at least 1");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(err.to_string().starts_with("failed to read configuration:"));
    }
}
