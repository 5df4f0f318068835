use crate::case::CaseStatus;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for configuring and running a regression suite
#[derive(Debug, Error)]
pub enum RegressionError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error at {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Test config parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid filter pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Failed to load output {}: {message}", path.display())]
    LoadError { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid status transition for case '{case}': {from} -> {to}")]
    StatusTransition { case: String, from: CaseStatus, to: CaseStatus },

    #[error("Worker pool error: {message}")]
    PoolError { message: String },
}

/// Result type for regression operations
pub type RegressionResult<T> = Result<T, RegressionError>;

impl RegressionError {
    /// Create a configuration error with a message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError { message: message.into() }
    }

    /// Wrap an IO error with the path it concerns
    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::IoError { path: path.as_ref().to_path_buf(), source }
    }

    /// Create an output load error
    pub fn load<P: AsRef<Path>, S: Into<String>>(path: P, message: S) -> Self {
        Self::LoadError { path: path.as_ref().to_path_buf(), message: message.into() }
    }

    /// Create a worker pool error
    pub fn pool<S: Into<String>>(message: S) -> Self {
        Self::PoolError { message: message.into() }
    }

    /// Whether this error must abort the whole run rather than one case
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. }
                | Self::YamlError(_)
                | Self::PatternError(_)
                | Self::PoolError { .. }
        )
    }

    /// Get error category for reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } => "config",
            Self::IoError { .. } => "io",
            Self::YamlError(_) => "config",
            Self::PatternError(_) => "filter",
            Self::LoadError { .. } => "load",
            Self::SerializationError(_) => "serialization",
            Self::StatusTransition { .. } => "status",
            Self::PoolError { .. } => "concurrency",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_fatal() {
        let err = RegressionError::config("jobs must be >= -1");
        assert!(err.is_fatal());
        assert_eq!(err.category(), "config");
        assert_eq!(err.to_string(), "Configuration error: jobs must be >= -1");
    }

    #[test]
    fn io_errors_name_the_path() {
        let err = RegressionError::io(
            "/tmp/case/run.log",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("/tmp/case/run.log"));
    }
}
