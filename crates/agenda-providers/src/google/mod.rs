//! Google Calendar access.
//!
//! # Authentication Flow
//!
//! 1. The operator provides an OAuth client (credentials file or
//!    environment variables)
//! 2. A cached token is used as-is when present
//! 3. Otherwise a loopback listener is bound and the consent page is opened
//!    with a PKCE challenge and a random state
//! 4. Google redirects back with an authorization code
//! 5. The code is exchanged for access and refresh tokens, which are cached
//!
//! The tool server only ever takes the environment path: it loads a token
//! written earlier by `agenda-mcp auth` and never starts a listener.
//!
//! # Example
//!
//! ```ignore
//! use agenda_providers::google::{
//!     AgendaService, GoogleCalendarClient, InteractiveOptions, OAuthClientConfig,
//!     acquire_interactive,
//! };
//!
//! let config = OAuthClientConfig::from_file("credentials.json")?;
//! let client = acquire_interactive(config, &InteractiveOptions::default()).await?;
//! let service = AgendaService::connect(GoogleCalendarClient::new(client)).await;
//! let events = service.events_for_day(chrono::Local::now().date_naive()).await?;
//! ```

mod authorized;
mod bootstrap;
mod browser;
mod callback;
mod client;
mod config;
mod oauth;
mod service;
mod tokens;

pub use authorized::AuthorizedClient;
pub use bootstrap::{
    DEFAULT_CREDENTIALS_FILE, DEFAULT_TOKEN_FILE, EnvironmentOptions, InteractiveOptions,
    acquire_from_env_source, acquire_from_environment, acquire_interactive,
};
pub use browser::{BrowserLauncher, ManualBrowser, SystemBrowser, launch as launch_browser};
pub use callback::{
    AuthorizationSession, CallbackServer, CallbackState, DEFAULT_AUTHORIZATION_TIMEOUT,
    DEFAULT_CALLBACK_PORT, DEFAULT_SHUTDOWN_GRACE, callback_addr,
};
pub use client::{ApiEvent, ApiEventTime, CALENDAR_API_BASE, GoogleCalendarClient};
pub use config::{
    CALENDAR_READONLY_SCOPE, DEFAULT_REDIRECT_URL, ENV_CLIENT_ID, ENV_CLIENT_SECRET,
    ENV_PROJECT_ID, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, OAuthClientConfig,
};
pub use oauth::{DEFAULT_HTTP_TIMEOUT, OAuthClient, PkceFlow};
pub use service::{AgendaService, AgendaSource, BoxFuture, PRIMARY_CALENDAR};
pub use tokens::{OAuthToken, TokenStore};
