//! Authentication command.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use agenda_providers::ProviderResult;
use agenda_providers::google::{
    AuthorizedClient, InteractiveOptions, ManualBrowser, OAuthClientConfig, acquire_interactive,
};

use crate::cli::AuthArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Runs the browser authorization flow and caches the token.
pub async fn run(args: &AuthArgs, config: &ClientConfig) -> ClientResult<()> {
    println!("🔐 Running authentication flow...");
    authorize(args, config).await.map_err(ClientError::Auth)?;
    println!("✅ Authentication successful! Token saved.");
    Ok(())
}

/// Returns an authorized client, reusing the cached token when present.
pub async fn authorize(args: &AuthArgs, config: &ClientConfig) -> ProviderResult<AuthorizedClient> {
    let credentials = args
        .credentials
        .clone()
        .unwrap_or_else(|| config.auth.credentials_file.clone());
    let client_config = OAuthClientConfig::from_file(&credentials)?;

    let options = interactive_options(args, config);
    info!(token_path = %options.token_path.display(), "authorizing");
    acquire_interactive(client_config, &options).await
}

/// Merges command line flags over the configuration file.
pub fn interactive_options(args: &AuthArgs, config: &ClientConfig) -> InteractiveOptions {
    let settings = &config.auth;
    let mut options = InteractiveOptions::default()
        .with_token_path(
            args.token_path
                .clone()
                .unwrap_or_else(|| settings.token_path.clone()),
        )
        .with_callback_port(args.port.unwrap_or(settings.callback_port))
        .with_timeout(Duration::from_secs(settings.timeout_secs));

    if args.no_browser || !settings.open_browser {
        options = options.with_browser(Arc::new(ManualBrowser));
    }
    options
}
