//! MCP mode: serves the agenda tools on stdin/stdout.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use agenda_providers::google::{
    AgendaService, EnvironmentOptions, GoogleCalendarClient, acquire_from_environment,
};
use agenda_server::ToolHandler;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Loads credentials from the environment and serves until stdin closes.
///
/// Nothing but protocol messages may be written to stdout in this mode.
pub async fn run(token_path: Option<PathBuf>, config: &ClientConfig) -> ClientResult<()> {
    eprintln!("🔌 Starting MCP server...");

    let options = environment_options(token_path, config);
    let client = acquire_from_environment(&options).map_err(ClientError::Startup)?;
    let service = AgendaService::connect(GoogleCalendarClient::new(client)).await;

    ToolHandler::new(Arc::new(service)).serve_stdio().await?;

    info!("MCP client disconnected, exiting");
    Ok(())
}

/// Flag first, then `[mcp] token_path`, then the executable's directory.
pub fn environment_options(token_path: Option<PathBuf>, config: &ClientConfig) -> EnvironmentOptions {
    match token_path.or_else(|| config.mcp.token_path.clone()) {
        Some(path) => EnvironmentOptions::default().with_token_path(path),
        None => EnvironmentOptions::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_config_file() {
        let mut config = ClientConfig::default();
        config.mcp.token_path = Some(PathBuf::from("/etc/agenda/token.json"));

        let options = environment_options(Some(PathBuf::from("/tmp/token.json")), &config);
        assert_eq!(options.token_path, Some(PathBuf::from("/tmp/token.json")));

        let options = environment_options(None, &config);
        assert_eq!(
            options.token_path,
            Some(PathBuf::from("/etc/agenda/token.json"))
        );
    }

    #[test]
    fn default_is_next_to_executable() {
        let options = environment_options(None, &ClientConfig::default());
        assert!(options.token_path.is_none());

        let resolved = options.resolve_token_path().unwrap();
        let exe_dir = std::env::current_exe().unwrap().parent().unwrap().to_path_buf();
        assert_eq!(resolved, exe_dir.join("token.json"));
    }
}
