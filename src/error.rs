//! Error types for picoagent

use thiserror::Error;

/// Result type alias using picoagent's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for picoagent
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing task state
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frontmatter parsing or writeback error
    #[error("Frontmatter error: {0}")]
    Frontmatter(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider (LLM backend) error. Fatal to the current loop invocation.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The provider's streaming call closed without emitting a `done` event.
    #[error("Stream ended without a final message")]
    StreamEndedWithoutMessage,

    /// A worker was aborted via its control handle.
    #[error("Task {0} was aborted")]
    Aborted(String),

    /// Invalid input supplied to a tool or operation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found (task, tool, span).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors that are fatal to an in-progress Agent Loop (§7
    /// categories 2-4): provider failures, malformed streams, and aborts.
    /// Every other category is absorbed into normal tool-result data flow.
    pub fn is_loop_fatal(&self) -> bool {
        matches!(
            self,
            Error::Provider(_) | Error::StreamEndedWithoutMessage | Error::Aborted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_fatal_categories() {
        assert!(Error::Provider("boom".into()).is_loop_fatal());
        assert!(Error::StreamEndedWithoutMessage.is_loop_fatal());
        assert!(Error::Aborted("t_001".into()).is_loop_fatal());
        assert!(!Error::InvalidInput("bad arg".into()).is_loop_fatal());
        assert!(!Error::NotFound("t_001".into()).is_loop_fatal());
    }
}
