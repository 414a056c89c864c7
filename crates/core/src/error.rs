//! Error types for Curator.
//!
//! One enum covers every failure category. Only two of them ever reach a
//! caller as a distinct condition: `DependencyOffline` (the embedding service
//! is gone, the request cannot be answered) and `InvalidRequest`. Everything
//! else collapses to an opaque internal error at the boundary.

use thiserror::Error;

/// Unified error type for Curator.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The embedding service is unreachable, timed out, or returned garbage.
    #[error("Dependency offline: {0}")]
    DependencyOffline(String),

    /// Text generation failed. Recovered locally, never surfaced.
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The inbound query carried neither question text nor a document id.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corpus loading and snapshot errors
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Anything unexpected
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP-style status code a transport collaborator should use.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidRequest(_) => 400,
            AppError::DependencyOffline(_) => 503,
            _ => 500,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::DependencyOffline(_) => "embeddings_offline",
            _ => "internal_error",
        }
    }

    /// Message that is safe to show to an end user.
    ///
    /// Internal details are never included.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::DependencyOffline(_) => {
                "The embedding service is temporarily unavailable. Try again in a few seconds."
                    .to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }

    pub fn is_dependency_offline(&self) -> bool {
        matches!(self, AppError::DependencyOffline(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(AppError::DependencyOffline("x".into()).status_code(), 503);
        assert_eq!(AppError::Internal("x".into()).status_code(), 500);
        assert_eq!(AppError::Corpus("x".into()).status_code(), 500);
    }

    #[test]
    fn test_public_message_hides_internal_detail() {
        let err = AppError::Internal("db password is hunter2".into());
        assert!(!err.public_message().contains("hunter2"));

        let err = AppError::DependencyOffline("connection refused at 10.0.0.3".into());
        assert!(!err.public_message().contains("10.0.0.3"));
        assert_eq!(err.kind(), "embeddings_offline");
    }

    #[test]
    fn test_invalid_request_message_is_passed_through() {
        let err = AppError::InvalidRequest("Missing 'question' field.".into());
        assert_eq!(err.public_message(), "Missing 'question' field.");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
