//! Server error types.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that end the MCP session.
///
/// Per-call failures never show up here; they are answered on the wire.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The client never completed the `initialize` handshake.
    #[error("Initialization error: {message}")]
    Init { message: String },

    /// The session task panicked or was cancelled.
    #[error("Session task failed: {0}")]
    Session(#[from] tokio::task::JoinError),
}

impl ServerError {
    /// Creates an initialization error.
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = ServerError::init("connection closed: initialize request");
        assert_eq!(
            err.to_string(),
            "Initialization error: connection closed: initialize request"
        );
    }
}
