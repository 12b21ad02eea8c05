//! agenda-mcp entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use agenda_client::cli::{Cli, Command};
use agenda_client::commands;
use agenda_client::config::ClientConfig;
use agenda_client::error::{ClientError, ClientResult, report};
use agenda_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr in every mode; stdout belongs to the agenda or to MCP.
    let tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else if cli.command.is_mcp() {
        TracingConfig::mcp()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", ClientError::from(e));
    }

    report(run(cli).await)
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().unwrap_or_else(|e| {
            warn!("ignoring configuration file: {}", e);
            ClientConfig::default()
        }),
    };

    match cli.command {
        Command::Auth(args) => commands::auth::run(&args, &config).await,
        Command::Text { date, auth } => commands::text::run(date.as_deref(), &auth, &config).await,
        Command::Mcp { token_path } => commands::mcp::run(token_path, &config).await,
    }
}
