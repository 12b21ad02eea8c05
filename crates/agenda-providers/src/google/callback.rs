//! Loopback listener receiving the OAuth redirect.
//!
//! Each [`AuthorizationSession`] binds its own listener, so repeated flows
//! in one process never share routing state. The first request on the
//! redirect path decides the outcome; later ones are answered with `409`
//! and ignored.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::oauth::PkceFlow;

/// Default listener port; matches the registered redirect target.
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// How long the operator has to complete consent in the browser.
pub const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How long the listener gets to stop before it is aborted.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Per-connection limit for receiving the request head.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on header bytes drained per request.
const MAX_REQUEST_HEAD: usize = 16 * 1024;

/// The redirect path the listener answers on.
const REDIRECT_PATH: &str = "/";

const SUCCESS_PAGE: &str = r#"<html>
<head><title>Authorization Success</title></head>
<body style="font-family: Arial, sans-serif; text-align: center; padding: 50px;">
<h1 style="color: green;">✅ Authorization Successful!</h1>
<p>You can now close this window and return to the terminal.</p>
</body>
</html>
"#;

const FAILURE_PAGE: &str = r#"<html>
<head><title>Authorization Failed</title></head>
<body style="font-family: Arial, sans-serif; text-align: center; padding: 50px;">
<h1 style="color: red;">❌ Authorization Failed</h1>
<p>Return to the terminal for details, then run the authorization again.</p>
</body>
</html>
"#;

const ALREADY_HANDLED_PAGE: &str = r#"<html>
<head><title>Authorization Already Handled</title></head>
<body style="font-family: Arial, sans-serif; text-align: center; padding: 50px;">
<p>This authorization request has already been handled. You can close this window.</p>
</body>
</html>
"#;

/// Lifecycle of the callback listener.
///
/// `Idle → Listening → {CodeReceived | Failed | TimedOut} → ShuttingDown →
/// Closed`. A session never returns to `Listening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState {
    /// No listener bound yet.
    Idle,
    /// Waiting for the redirect.
    Listening,
    /// A code arrived.
    CodeReceived,
    /// The redirect carried no code, a denial or a foreign state.
    Failed,
    /// Nobody came back in time.
    TimedOut,
    /// Listener stop requested.
    ShuttingDown,
    /// Listener gone.
    Closed,
}

/// What the first redirect request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallbackOutcome {
    Code(String),
    Failed(String),
}

/// A bound loopback listener with a single-use completion signal.
#[derive(Debug)]
pub struct CallbackServer {
    local_addr: SocketAddr,
    state: CallbackState,
    outcome_rx: Option<oneshot::Receiver<CallbackOutcome>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Loopback address for the callback listener on `port`.
pub fn callback_addr(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

impl CallbackServer {
    /// Binds `addr` and starts accepting redirects for `expected_state`.
    pub async fn bind(addr: SocketAddr, expected_state: impl Into<String>) -> ProviderResult<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            ProviderError::configuration(format!(
                "failed to start callback listener on {}: {}",
                addr, e
            ))
            .with_source(e)
        })?;
        let local_addr = listener.local_addr().map_err(|e| {
            ProviderError::internal(format!("callback listener has no address: {}", e))
                .with_source(e)
        })?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(
            listener,
            expected_state.into(),
            outcome_tx,
            shutdown_rx,
        ));

        info!(%local_addr, "listening for authorization callback");
        Ok(Self {
            local_addr,
            state: CallbackState::Listening,
            outcome_rx: Some(outcome_rx),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Redirect target pointing at this listener.
    pub fn redirect_url(&self) -> String {
        format!("http://localhost:{}", self.local_addr.port())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CallbackState {
        self.state
    }

    /// Waits for the redirect, at most `limit`.
    ///
    /// Can be awaited once; the first redirect decides the result.
    pub async fn wait_for_code(&mut self, limit: Duration) -> ProviderResult<String> {
        let outcome_rx = self.outcome_rx.take().ok_or_else(|| {
            ProviderError::internal("authorization callback has already been awaited")
        })?;

        match tokio::time::timeout(limit, outcome_rx).await {
            Ok(Ok(CallbackOutcome::Code(code))) => {
                self.state = CallbackState::CodeReceived;
                Ok(code)
            }
            Ok(Ok(CallbackOutcome::Failed(reason))) => {
                self.state = CallbackState::Failed;
                Err(ProviderError::authorization(reason))
            }
            Ok(Err(_)) => {
                self.state = CallbackState::Failed;
                Err(ProviderError::internal(
                    "callback listener stopped before an authorization arrived",
                ))
            }
            Err(_) => {
                self.state = CallbackState::TimedOut;
                Err(ProviderError::timed_out(format!(
                    "authorization timed out after {} seconds",
                    limit.as_secs()
                )))
            }
        }
    }

    /// Stops the listener, waiting up to `grace` before aborting it.
    ///
    /// Never fails; overruns are logged.
    pub async fn shutdown(&mut self, grace: Duration) {
        if self.state == CallbackState::Closed {
            return;
        }
        self.state = CallbackState::ShuttingDown;

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(grace, &mut task).await {
                Ok(Ok(())) => debug!("callback listener stopped"),
                Ok(Err(e)) => warn!("callback listener task failed: {}", e),
                Err(_) => {
                    warn!(
                        "callback listener did not stop within {:?}, aborting",
                        grace
                    );
                    task.abort();
                }
            }
        }

        self.state = CallbackState::Closed;
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Sender for the first redirect outcome, shared by the connection tasks.
type OutcomeSlot = Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>;

async fn accept_loop(
    listener: TcpListener,
    expected_state: String,
    outcome_tx: oneshot::Sender<CallbackOutcome>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let expected_state: Arc<str> = expected_state.into();
    let outcome_tx: OutcomeSlot = Arc::new(Mutex::new(Some(outcome_tx)));
    // A slow or idle client only holds up its own task.
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "callback connection");
                    connections.spawn(handle_connection(
                        stream,
                        Arc::clone(&expected_state),
                        Arc::clone(&outcome_tx),
                    ));
                }
                Err(e) => warn!("failed to accept callback connection: {}", e),
            },
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                match finished {
                    Ok(Err(e)) => debug!("callback connection error: {}", e),
                    Err(e) if e.is_panic() => warn!("callback connection task panicked: {}", e),
                    _ => {}
                }
            }
        }
    }

    drop(listener);
    if !connections.is_empty() {
        debug!(open = connections.len(), "dropping open callback connections");
    }
    connections.shutdown().await;
}

async fn handle_connection(
    mut stream: TcpStream,
    expected_state: Arc<str>,
    outcome_tx: OutcomeSlot,
) -> io::Result<()> {
    let target = match tokio::time::timeout(READ_TIMEOUT, read_request_target(&mut stream)).await {
        Ok(Ok(Some(target))) => target,
        Ok(Ok(None)) => {
            return write_page(&mut stream, 400, "Bad Request", FAILURE_PAGE).await;
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "timed out reading callback request",
            ));
        }
    };

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    if path != REDIRECT_PATH {
        debug!(path, "ignoring request outside the redirect path");
        return write_page(&mut stream, 404, "Not Found", "").await;
    }

    let Some(sender) = outcome_tx.lock().await.take() else {
        return write_page(&mut stream, 409, "Conflict", ALREADY_HANDLED_PAGE).await;
    };

    let outcome = evaluate_redirect(query, &expected_state);
    let written = match &outcome {
        CallbackOutcome::Code(_) => {
            info!("authorization code received");
            write_page(&mut stream, 200, "OK", SUCCESS_PAGE).await
        }
        CallbackOutcome::Failed(reason) => {
            warn!("authorization callback failed: {}", reason);
            write_page(&mut stream, 400, "Bad Request", FAILURE_PAGE).await
        }
    };

    let _ = sender.send(outcome);
    written
}

/// Reads the request head and returns the target of a `GET` request.
async fn read_request_target(stream: &mut TcpStream) -> io::Result<Option<String>> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }

    let mut consumed = request_line.len();
    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await?;
        consumed += n;
        if n == 0 || header.trim_end().is_empty() || consumed > MAX_REQUEST_HEAD {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Ok(Some(target.to_string())),
        _ => Ok(None),
    }
}

fn evaluate_redirect(query: &str, expected_state: &str) -> CallbackOutcome {
    let mut code = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return CallbackOutcome::Failed(format!("authorization denied: {error}"));
    }

    if let Some(state) = state
        && state != expected_state
    {
        return CallbackOutcome::Failed("state mismatch".to_string());
    }

    match code {
        Some(code) if !code.is_empty() => CallbackOutcome::Code(code),
        _ => CallbackOutcome::Failed("no authorization code received".to_string()),
    }
}

async fn write_page(
    stream: &mut TcpStream,
    status: u16,
    reason: &str,
    body: &str,
) -> io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

/// One interactive authorization attempt.
///
/// Owns the PKCE pair, the anti-forgery state and, once listening, the
/// callback listener.
#[derive(Debug)]
pub struct AuthorizationSession {
    pkce: PkceFlow,
    server: Option<CallbackServer>,
    closed: bool,
}

impl AuthorizationSession {
    /// Creates an idle session with fresh PKCE values.
    pub fn new() -> Self {
        Self {
            pkce: PkceFlow::new(),
            server: None,
            closed: false,
        }
    }

    /// PKCE values and state for this attempt.
    pub fn pkce(&self) -> &PkceFlow {
        &self.pkce
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CallbackState {
        match &self.server {
            Some(server) => server.state(),
            None if self.closed => CallbackState::Closed,
            None => CallbackState::Idle,
        }
    }

    /// Binds the callback listener and returns the redirect target for it.
    pub async fn listen(&mut self, addr: SocketAddr) -> ProviderResult<String> {
        if self.state() != CallbackState::Idle {
            return Err(ProviderError::internal(
                "authorization session is no longer idle",
            ));
        }
        let server = CallbackServer::bind(addr, self.pkce.state.clone()).await?;
        let redirect_url = server.redirect_url();
        self.server = Some(server);
        Ok(redirect_url)
    }

    /// Address of the bound listener, if listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(CallbackServer::local_addr)
    }

    /// Waits for the redirect, at most `limit`.
    pub async fn wait(&mut self, limit: Duration) -> ProviderResult<String> {
        match self.server.as_mut() {
            Some(server) => server.wait_for_code(limit).await,
            None => Err(ProviderError::internal(
                "authorization session is not listening",
            )),
        }
    }

    /// Tears the listener down.
    pub async fn close(&mut self, grace: Duration) {
        if let Some(server) = self.server.as_mut() {
            server.shutdown(grace).await;
        }
        self.closed = true;
    }
}

impl Default for AuthorizationSession {
    fn default() -> Self {
        Self::new()
    }
}
