//! Credential bootstrap.
//!
//! Two acquisition paths that never share code for obtaining a token:
//!
//! - [`acquire_interactive`]: reuse the cached token, or run the browser
//!   consent flow and cache its result. Used by the terminal modes.
//! - [`acquire_from_environment`]: build the client identity from
//!   environment variables and load a token written earlier by the
//!   interactive flow. Never listens, never opens a browser. Used by the
//!   tool server.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

use super::authorized::AuthorizedClient;
use super::browser::{self, BrowserLauncher, SystemBrowser};
use super::callback::{
    AuthorizationSession, DEFAULT_AUTHORIZATION_TIMEOUT, DEFAULT_CALLBACK_PORT,
    DEFAULT_SHUTDOWN_GRACE, callback_addr,
};
use super::config::OAuthClientConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStore;

/// Token file name used by both paths.
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Credentials file read by the interactive path.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Settings for [`acquire_interactive`].
#[derive(Clone)]
pub struct InteractiveOptions {
    /// Where the token is cached.
    pub token_path: PathBuf,
    /// Loopback port for the redirect listener.
    pub callback_port: u16,
    /// How long to wait for the operator to finish consent.
    pub timeout: Duration,
    /// Grace period for stopping the listener.
    pub shutdown_grace: Duration,
    /// Used to open the consent page.
    pub browser: Arc<dyn BrowserLauncher>,
}

impl fmt::Debug for InteractiveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveOptions")
            .field("token_path", &self.token_path)
            .field("callback_port", &self.callback_port)
            .field("timeout", &self.timeout)
            .field("shutdown_grace", &self.shutdown_grace)
            .finish_non_exhaustive()
    }
}

impl Default for InteractiveOptions {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from(DEFAULT_TOKEN_FILE),
            callback_port: DEFAULT_CALLBACK_PORT,
            timeout: DEFAULT_AUTHORIZATION_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            browser: Arc::new(SystemBrowser),
        }
    }
}

impl InteractiveOptions {
    /// Sets the token cache path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the redirect listener port.
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    /// Sets the consent timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the browser launcher.
    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }
}

/// Returns an authorized client, running the browser consent flow when no
/// usable token is cached.
///
/// A cached token is used as-is, without contacting any endpoint.
/// Progress for the operator is printed to stderr.
pub async fn acquire_interactive(
    config: OAuthClientConfig,
    options: &InteractiveOptions,
) -> ProviderResult<AuthorizedClient> {
    let store = TokenStore::new(&options.token_path);

    match store.load() {
        Ok(token) => {
            debug!("using cached token from {}", store.path().display());
            let oauth = OAuthClient::new(config)?;
            return Ok(AuthorizedClient::new(oauth, token, Some(store)));
        }
        Err(e) if e.code() == ProviderErrorCode::TokenNotFound => {
            info!("no cached token, starting browser authorization");
        }
        Err(e) => {
            warn!("cached token unusable, starting browser authorization: {}", e);
        }
    }

    let mut session = AuthorizationSession::new();
    let redirect_url = session.listen(callback_addr(options.callback_port)).await?;
    let oauth = OAuthClient::new(config.with_redirect_url(redirect_url))?;

    let outcome = await_consent(&oauth, &mut session, options).await;
    session.close(options.shutdown_grace).await;
    let code = outcome?;

    let token = oauth
        .exchange_code(&code, &session.pkce().verifier)
        .await
        .map_err(|e| {
            ProviderError::new(
                e.code(),
                format!("unable to retrieve token from web: {}", e.message()),
            )
            .with_source(e)
        })?;

    eprintln!("Saving credential file to: {}", store.path().display());
    store.save(&token)?;

    Ok(AuthorizedClient::new(oauth, token, Some(store)))
}

async fn await_consent(
    oauth: &OAuthClient,
    session: &mut AuthorizationSession,
    options: &InteractiveOptions,
) -> ProviderResult<String> {
    let auth_url = oauth.authorization_url(session.pkce())?;

    eprintln!("Opening browser for authorization...");
    eprintln!("If the browser doesn't open automatically, go to: {auth_url}");
    browser::launch(options.browser.as_ref(), &auth_url);

    let code = session.wait(options.timeout).await?;
    eprintln!("✅ Authorization code received successfully!");
    Ok(code)
}

/// Settings for [`acquire_from_environment`].
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOptions {
    /// Explicit token location; defaults to `token.json` next to the
    /// running executable.
    pub token_path: Option<PathBuf>,
}

impl EnvironmentOptions {
    /// Sets an explicit token location.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// The token location that will be read.
    pub fn resolve_token_path(&self) -> ProviderResult<PathBuf> {
        if let Some(path) = &self.token_path {
            return Ok(path.clone());
        }

        let exe = std::env::current_exe().map_err(|e| {
            ProviderError::configuration(format!("unable to locate executable: {}", e))
                .with_source(e)
        })?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(DEFAULT_TOKEN_FILE))
    }
}

/// Builds an authorized client from the process environment and a token
/// written earlier by the interactive flow.
pub fn acquire_from_environment(options: &EnvironmentOptions) -> ProviderResult<AuthorizedClient> {
    acquire_from_env_source(|key| std::env::var(key).ok(), options)
}

/// Like [`acquire_from_environment`] with an injected variable lookup.
pub fn acquire_from_env_source<F>(
    lookup: F,
    options: &EnvironmentOptions,
) -> ProviderResult<AuthorizedClient>
where
    F: Fn(&str) -> Option<String>,
{
    let config = OAuthClientConfig::from_env_source(lookup)?;
    let token_path = options.resolve_token_path()?;
    let store = TokenStore::new(&token_path);

    let token = store.load().map_err(|e| {
        ProviderError::new(
            e.code(),
            format!(
                "unable to load existing token from {}: {}. Please run 'agenda-mcp auth' first",
                token_path.display(),
                e.message()
            ),
        )
        .with_source(e)
    })?;

    info!("loaded token from {}", token_path.display());
    let oauth = OAuthClient::new(config)?;
    Ok(AuthorizedClient::new(oauth, token, Some(store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::tokens::OAuthToken;
    use std::collections::HashMap;
    use std::io;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Fails to open anything but hands the URL to the test.
    struct CapturingBrowser {
        urls: mpsc::UnboundedSender<String>,
    }

    impl BrowserLauncher for CapturingBrowser {
        fn open(&self, url: &str) -> io::Result<()> {
            let _ = self.urls.send(url.to_string());
            Err(io::Error::other("no display available"))
        }
    }

    fn capturing_browser() -> (Arc<dyn BrowserLauncher>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(CapturingBrowser { urls: tx }), rx)
    }

    async fn token_endpoint(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;
        server
    }

    fn token_url(server: &MockServer) -> String {
        format!("{}/token", server.uri())
    }

    fn env_vars() -> HashMap<String, String> {
        [
            ("client_id", "abc.apps.googleusercontent.com"),
            ("project_id", "agenda-123"),
            ("client_secret", "shh"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[tokio::test]
    async fn cached_token_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let cached = OAuthToken::new("ya29.cached").with_refresh_token("1//r");
        TokenStore::new(&token_path).save(&cached).unwrap();

        let server = token_endpoint(500, "{}").await;
        // Occupied port: binding a listener here would fail the call.
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let (browser, mut urls) = capturing_browser();

        let options = InteractiveOptions::default()
            .with_token_path(&token_path)
            .with_callback_port(occupied.local_addr().unwrap().port())
            .with_browser(browser);
        let config = OAuthClientConfig::new("id", "secret").with_token_url(token_url(&server));

        let client = acquire_interactive(config, &options).await.unwrap();
        assert_eq!(client.token().await, cached);
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(urls.try_recv().is_err());
    }

    #[tokio::test]
    async fn browser_failure_does_not_stop_flow() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let server = token_endpoint(
            200,
            r#"{"access_token":"ya29.web","refresh_token":"1//web","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .await;
        let (browser, mut urls) = capturing_browser();

        let options = InteractiveOptions::default()
            .with_token_path(&token_path)
            .with_callback_port(0)
            .with_timeout(Duration::from_secs(10))
            .with_browser(browser);
        let config = OAuthClientConfig::new("id", "secret").with_token_url(token_url(&server));

        let flow = tokio::spawn(async move { acquire_interactive(config, &options).await });

        let auth_url = url::Url::parse(&urls.recv().await.unwrap()).unwrap();
        let params: HashMap<String, String> = auth_url.query_pairs().into_owned().collect();
        let redirect = url::Url::parse(&params["redirect_uri"]).unwrap();
        let port = redirect.port().unwrap();

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .unwrap();
        let request = format!(
            "GET /?state={}&code=4%2Fcode HTTP/1.1\r\nHost: localhost\r\n\r\n",
            params["state"]
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));

        let client = flow.await.unwrap().unwrap();
        assert_eq!(client.token().await.access_token, "ya29.web");

        let saved = TokenStore::new(&token_path).load().unwrap();
        assert_eq!(saved.refresh_token.as_deref(), Some("1//web"));

        let requests = server.received_requests().await.unwrap();
        let exchange = String::from_utf8_lossy(&requests[0].body);
        assert!(exchange.contains("code=4%2Fcode"));
        assert!(exchange.contains(&format!("redirect_uri=http%3A%2F%2Flocalhost%3A{port}")));
    }

    #[tokio::test]
    async fn no_consent_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let (browser, _urls) = capturing_browser();

        let options = InteractiveOptions::default()
            .with_token_path(&token_path)
            .with_callback_port(0)
            .with_timeout(Duration::from_millis(100))
            .with_browser(browser);

        let err = acquire_interactive(OAuthClientConfig::new("id", "secret"), &options)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthorizationTimedOut);
        assert!(!token_path.exists());
    }

    #[test]
    fn env_missing_variable_fails_before_token() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStore::new(&token_path)
            .save(&OAuthToken::new("a"))
            .unwrap();

        let mut vars = env_vars();
        vars.remove("project_id");
        let options = EnvironmentOptions::default().with_token_path(&token_path);

        let err = acquire_from_env_source(|k| vars.get(k).cloned(), &options).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("project_id"));
    }

    #[test]
    fn env_without_token_asks_for_auth() {
        let dir = tempfile::tempdir().unwrap();
        let vars = env_vars();
        let options = EnvironmentOptions::default().with_token_path(dir.path().join("token.json"));

        let err = acquire_from_env_source(|k| vars.get(k).cloned(), &options).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::TokenNotFound);
        assert!(err.message().contains("Please run 'agenda-mcp auth' first"));
    }

    #[tokio::test]
    async fn env_with_token_builds_client() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let token = OAuthToken::new("ya29.env").with_refresh_token("1//r");
        TokenStore::new(&token_path).save(&token).unwrap();

        let vars = env_vars();
        let options = EnvironmentOptions::default().with_token_path(&token_path);
        let client = acquire_from_env_source(|k| vars.get(k).cloned(), &options).unwrap();
        assert_eq!(client.token().await, token);
    }

    #[test]
    fn default_env_token_path_is_next_to_executable() {
        let path = EnvironmentOptions::default().resolve_token_path().unwrap();
        let exe_dir = std::env::current_exe().unwrap().parent().unwrap().to_path_buf();
        assert_eq!(path, exe_dir.join("token.json"));
    }
}
