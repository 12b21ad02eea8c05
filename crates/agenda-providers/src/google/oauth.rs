//! OAuth 2.0 authorization code flow with PKCE.
//!
//! Builds the consent URL, exchanges the returned code for tokens and
//! refreshes stale access tokens. The redirect listener lives in
//! [`super::callback`].

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthClientConfig;
use super::tokens::OAuthToken;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Random bytes in the anti-forgery state value.
const STATE_LENGTH: usize = 16;

/// Default HTTP timeout for token endpoint requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// PKCE verifier/challenge pair plus the anti-forgery state.
///
/// Implements RFC 7636 with the S256 method.
#[derive(Debug, Clone)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// SHA-256 of the verifier, base64url encoded.
    pub challenge: String,
    /// Random state echoed back on the redirect.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(STATE_LENGTH),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>) -> OAuthToken {
        let mut token = OAuthToken::new(self.access_token);
        if let Some(token_type) = self.token_type {
            token.token_type = token_type;
        }
        token.refresh_token = self.refresh_token.or(previous_refresh);
        match self.expires_in {
            Some(secs) if secs > 0 => token.expires_in(secs),
            _ => token,
        }
    }
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Talks to the OAuth endpoints of one client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthClientConfig,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client with the default HTTP timeout.
    pub fn new(config: OAuthClientConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// Creates a client sharing an existing HTTP client.
    pub fn with_http_client(config: OAuthClientConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    /// Returns the underlying HTTP client.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Builds the consent URL for an offline-access, PKCE-protected request.
    pub fn authorization_url(&self, pkce: &PkceFlow) -> ProviderResult<String> {
        let scope = self.config.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", pkce.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("code_challenge", pkce.challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| {
            ProviderError::configuration(format!(
                "invalid authorization endpoint {}: {}",
                self.config.auth_url, e
            ))
            .with_source(e)
        })?;
        Ok(url.into())
    }

    /// Exchanges an authorization code for a token.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> ProviderResult<OAuthToken> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];

        let response = self.request_token(&params, "token exchange").await?;
        info!("obtained OAuth token");
        Ok(response.into_token(None))
    }

    /// Mints a new access token from the token's refresh value.
    ///
    /// The refresh value is carried over when the endpoint does not issue a
    /// new one.
    pub async fn refresh(&self, token: &OAuthToken) -> ProviderResult<OAuthToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::authentication(
                    "access token expired and no refresh token is available",
                )
            })?;

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.request_token(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok(response.into_token(token.refresh_token.clone()))
    }

    async fn request_token(
        &self,
        params: &[(&str, &str)],
        action: &str,
    ) -> ProviderResult<TokenResponse> {
        debug!("{} request to {}", action, self.config.token_url);

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed: {}", action, e)).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read {} response: {}", action, e))
                .with_source(e)
        })?;

        if status.is_server_error() {
            return Err(ProviderError::server(format!(
                "{} failed ({}): {}",
                action, status, body
            )));
        }

        if !status.is_success() {
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                action, status, reason
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid {} response: {}", action, e))
                .with_source(e)
        })
    }
}
