//! OAuth client configuration.
//!
//! The same [`OAuthClientConfig`] is produced whether the client identity
//! comes from a Google Cloud Console credentials file or from environment
//! variables, so everything downstream is source-agnostic.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// Google's OAuth authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read-only calendar scope.
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Redirect target registered for the local callback listener.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:8080";

/// Environment variable holding the OAuth client id.
pub const ENV_CLIENT_ID: &str = "client_id";

/// Environment variable holding the Google Cloud project id.
pub const ENV_PROJECT_ID: &str = "project_id";

/// Environment variable holding the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "client_secret";

/// OAuth 2.0 client configuration for the Google Calendar API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    /// OAuth client id from Google Cloud Console.
    pub client_id: String,
    /// OAuth client secret from Google Cloud Console.
    pub client_secret: String,
    /// Google Cloud project id, when known.
    pub project_id: Option<String>,
    /// Authorization endpoint.
    pub auth_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// Where the provider sends the user back after consent.
    pub redirect_url: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
}

/// Google credentials JSON as downloaded from the Cloud Console.
///
/// Accepts an `installed` or `web` section, or flat `client_id` /
/// `client_secret` keys at the root.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<CredentialsSection>,
    web: Option<CredentialsSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
    project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialsSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

impl OAuthClientConfig {
    /// Creates a configuration with Google's endpoints, the default redirect
    /// and the read-only calendar scope.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            project_id: None,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            scopes: vec![CALENDAR_READONLY_SCOPE.to_string()],
        }
    }

    /// Loads the configuration from a credentials JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "unable to read client secret file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        debug!("read OAuth client credentials from {}", path.display());
        Self::from_json(&content)
    }

    /// Parses a credentials JSON document.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("unable to parse client secret file: {}", e))
                .with_source(e)
        })?;

        let config = if let Some(section) = file.installed.or(file.web) {
            let mut config = Self::new(section.client_id, section.client_secret);
            config.project_id = section.project_id;
            if let Some(auth_uri) = section.auth_uri {
                config.auth_url = auth_uri;
            }
            if let Some(token_uri) = section.token_uri {
                config.token_url = token_uri;
            }
            config
        } else if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret)
        {
            let mut config = Self::new(client_id, client_secret);
            config.project_id = file.project_id;
            config
        } else {
            return Err(ProviderError::configuration(
                "credentials file must contain an 'installed' or 'web' section, \
                 or 'client_id' and 'client_secret' at the root",
            ));
        };

        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from the process environment.
    pub fn from_env() -> ProviderResult<Self> {
        Self::from_env_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Variables are checked in the order `client_id`, `project_id`,
    /// `client_secret`; the first missing or empty one is reported.
    pub fn from_env_source<F>(lookup: F) -> ProviderResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key).filter(|value| !value.is_empty()).ok_or_else(|| {
                ProviderError::configuration(format!("{key} environment variable is required"))
            })
        };

        let client_id = require(ENV_CLIENT_ID)?;
        let project_id = require(ENV_PROJECT_ID)?;
        let client_secret = require(ENV_CLIENT_SECRET)?;

        let mut config = Self::new(client_id, client_secret);
        config.project_id = Some(project_id);
        Ok(config)
    }

    /// Checks that the identity fields are present.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.client_id.is_empty() {
            return Err(ProviderError::configuration("client_id is required"));
        }
        if self.client_secret.is_empty() {
            return Err(ProviderError::configuration("client_secret is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            warn!("client_id does not end with .apps.googleusercontent.com");
        }
        Ok(())
    }

    /// Sets the redirect target.
    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = redirect_url.into();
        self
    }

    /// Sets the token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}
