//! An HTTP handle carrying a bearer token that refreshes itself.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ProviderResult;

use super::oauth::OAuthClient;
use super::tokens::{OAuthToken, TokenStore};

/// Authorized access to Google APIs.
///
/// Cloning is cheap; clones share the token. Stale access values are
/// refreshed on demand and written back to the store when one is attached.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    oauth: OAuthClient,
    token: RwLock<OAuthToken>,
    store: Option<TokenStore>,
    http_client: reqwest::Client,
}

impl AuthorizedClient {
    /// Wraps a token. `store`, when given, receives refreshed tokens.
    pub fn new(oauth: OAuthClient, token: OAuthToken, store: Option<TokenStore>) -> Self {
        let http_client = oauth.http_client().clone();
        Self {
            inner: Arc::new(Inner {
                oauth,
                token: RwLock::new(token),
                store,
                http_client,
            }),
        }
    }

    /// HTTP client to send authorized requests with.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.http_client
    }

    /// Snapshot of the current token.
    pub async fn token(&self) -> OAuthToken {
        self.inner.token.read().await.clone()
    }

    /// Returns a usable access value, refreshing first if it is stale.
    pub async fn access_token(&self) -> ProviderResult<String> {
        {
            let token = self.inner.token.read().await;
            if !token.is_stale() {
                return Ok(token.access_token.clone());
            }
        }

        let mut token = self.inner.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if !token.is_stale() {
            return Ok(token.access_token.clone());
        }

        debug!("access token is stale, refreshing");
        let fresh = self.inner.oauth.refresh(&token).await?;
        if let Some(store) = &self.inner.store
            && let Err(e) = store.save(&fresh)
        {
            warn!("failed to persist refreshed token: {}", e);
        }

        *token = fresh;
        Ok(token.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorCode;
    use crate::google::config::OAuthClientConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn token_endpoint(status: u16, body: &str, calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body, "application/json"))
            .expect(calls)
            .mount(&server)
            .await;
        server
    }

    fn oauth(server: &MockServer) -> OAuthClient {
        let config = OAuthClientConfig::new("id", "secret")
            .with_token_url(format!("{}/token", server.uri()));
        OAuthClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn fresh_token_is_used_without_network() {
        let server = token_endpoint(500, "{}", 0).await;
        let client = AuthorizedClient::new(
            oauth(&server),
            OAuthToken::new("ya29.cached").expires_in(3600),
            None,
        );

        assert_eq!(client.access_token().await.unwrap(), "ya29.cached");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_and_persisted() {
        let server = token_endpoint(
            200,
            r#"{"access_token":"ya29.fresh","expires_in":3599,"token_type":"Bearer"}"#,
            1,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        let client = AuthorizedClient::new(
            oauth(&server),
            OAuthToken::new("ya29.old")
                .with_refresh_token("1//r")
                .expires_in(-60),
            Some(store.clone()),
        );

        assert_eq!(client.access_token().await.unwrap(), "ya29.fresh");
        assert_eq!(client.access_token().await.unwrap(), "ya29.fresh");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);

        let saved = store.load().unwrap();
        assert_eq!(saved.access_token, "ya29.fresh");
        assert_eq!(saved.refresh_token.as_deref(), Some("1//r"));
    }

    #[tokio::test]
    async fn rejected_refresh_is_authentication_error() {
        let server = token_endpoint(400, r#"{"error":"invalid_grant"}"#, 1).await;
        let client = AuthorizedClient::new(
            oauth(&server),
            OAuthToken::new("ya29.old")
                .with_refresh_token("1//revoked")
                .expires_in(-60),
            None,
        );

        let err = client.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(client.token().await.access_token, "ya29.old");
    }
}
