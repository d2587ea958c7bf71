//! Typed errors for the research library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Provider and parse
//! failures are recovered where they happen; only configuration and input
//! errors ever escape a research session.

use thiserror::Error;

/// Errors that can occur during research operations.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Completion service unavailable or failed
    #[error("completion service error: {0}")]
    Completion(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Search provider failed
    #[error("search error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Completion output did not match the expected schema
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// External call exceeded its time limit
    #[error("timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Invalid configuration (missing credentials, invalid budgets)
    #[error("config error: {0}")]
    Config(String),

    /// The company to research is not usable
    #[error("invalid entity: {reason}")]
    InvalidEntity { reason: String },
}

impl ResearchError {
    /// Create a completion error from a message.
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion(message.into().into())
    }

    /// Create a search error from a message.
    pub fn search(message: impl Into<String>) -> Self {
        Self::Search(message.into().into())
    }

    /// Whether this error must stop a session before it starts.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidEntity { .. })
    }
}

/// Result type alias for research operations.
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_setup_errors_are_fatal() {
        assert!(ResearchError::Config("OPENAI_API_KEY not set".into()).is_fatal());
        assert!(ResearchError::InvalidEntity {
            reason: "empty name".into()
        }
        .is_fatal());
        assert!(!ResearchError::completion("rate limited").is_fatal());
        assert!(!ResearchError::search("connection reset").is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = ResearchError::Timeout {
            operation: "search 'Acme founders'".into(),
            seconds: 30,
        };
        assert_eq!(err.to_string(), "timed out after 30s: search 'Acme founders'");
    }
}
