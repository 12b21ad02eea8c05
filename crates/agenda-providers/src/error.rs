//! Error types for authorization and calendar operations.
//!
//! Every failure in this crate is a [`ProviderError`]: a category
//! ([`ProviderErrorCode`]) plus a human-readable message and an optional
//! underlying cause.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Missing or malformed credentials, environment or settings.
    ConfigurationError,
    /// The authorization callback failed (no code, denial, state mismatch).
    AuthorizationFailed,
    /// Nobody completed the authorization in time.
    AuthorizationTimedOut,
    /// The token endpoint rejected a code exchange or refresh, or the API
    /// rejected the access token.
    AuthenticationFailed,
    /// No persisted token exists at the expected path.
    TokenNotFound,
    /// The persisted token could not be read, parsed or written.
    TokenIo,
    /// Connection failure, timeout, DNS resolution, etc.
    NetworkError,
    /// The server returned a 5xx or otherwise unexpected status.
    ServerError,
    /// Too many requests.
    RateLimited,
    /// The response body could not be understood.
    InvalidResponse,
    /// The account lacks access to the calendar (403).
    AuthorizationDenied,
    /// Broken invariant, e.g. the callback task disappeared.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns a stable snake_case name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::AuthorizationFailed => "authorization_failed",
            Self::AuthorizationTimedOut => "authorization_timed_out",
            Self::AuthenticationFailed => "authentication_failed",
            Self::TokenNotFound => "token_not_found",
            Self::TokenIo => "token_io",
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::RateLimited => "rate_limited",
            Self::InvalidResponse => "invalid_response",
            Self::AuthorizationDenied => "authorization_denied",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while authorizing or talking to the calendar API.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an authorization (callback) error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    /// Creates an authorization timeout error.
    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationTimedOut, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates a token-not-found error.
    pub fn token_not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::TokenNotFound, message)
    }

    /// Creates a token I/O error.
    pub fn token_io(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::TokenIo, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates an access-denied error.
    pub fn denied(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationDenied, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
