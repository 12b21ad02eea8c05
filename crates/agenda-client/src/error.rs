//! Client error types.

use std::fmt;
use std::process::ExitCode;

use agenda_core::{DateError, TracingError};
use agenda_providers::ProviderError;
use agenda_server::ServerError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a command with a failure status.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration file could not be used.
    Config(String),
    /// `--date` was not a `YYYY-MM-DD` calendar day.
    InvalidDate(DateError),
    /// The interactive authorization flow failed.
    Auth(ProviderError),
    /// The tool server could not obtain its calendar access.
    Startup(ProviderError),
    /// Reading the agenda failed.
    Query {
        /// What was being fetched, e.g. "today's events".
        what: String,
        source: ProviderError,
    },
    /// The MCP serving loop failed.
    Server(ServerError),
    /// Logging could not be set up.
    Tracing(TracingError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::InvalidDate(err) => write!(f, "{}", err),
            Self::Auth(err) => write!(f, "Authentication failed: {}", err),
            Self::Startup(err) => write!(f, "Failed to initialize calendar service: {}", err),
            Self::Query { what, source } => write!(f, "Failed to get {}: {}", what, source),
            Self::Server(err) => write!(f, "MCP server error: {}", err),
            Self::Tracing(err) => write!(f, "logging setup failed: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(_) => None,
            Self::InvalidDate(err) => Some(err),
            Self::Auth(err) | Self::Startup(err) => Some(err),
            Self::Query { source, .. } => Some(source),
            Self::Server(err) => Some(err),
            Self::Tracing(err) => Some(err),
        }
    }
}

impl From<DateError> for ClientError {
    fn from(err: DateError) -> Self {
        Self::InvalidDate(err)
    }
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        Self::Server(err)
    }
}

impl From<TracingError> for ClientError {
    fn from(err: TracingError) -> Self {
        Self::Tracing(err)
    }
}

/// Prints a failed command's error to stderr and picks the exit status.
pub fn report(result: ClientResult<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
