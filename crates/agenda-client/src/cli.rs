//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const ENVIRONMENT_HELP: &str = "\
Environment variables for MCP mode:
  client_id     - Google OAuth client ID
  project_id    - Google project ID
  client_secret - Google OAuth client secret";

/// agenda-mcp - Your Google Calendar agenda, in the terminal or over MCP
#[derive(Debug, Parser)]
#[command(name = "agenda-mcp")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true, after_help = ENVIRONMENT_HELP)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "AGENDA_MCP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available modes.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run OAuth authentication flow and exit
    Auth(AuthArgs),

    /// Display the agenda for today or a given date
    #[command(alias = "test")]
    Text {
        /// Day to show, as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Start MCP server to provide agenda tools over stdio
    Mcp {
        /// Token written by `agenda-mcp auth` (default: next to the executable)
        #[arg(long, env = "AGENDA_MCP_TOKEN_PATH")]
        token_path: Option<PathBuf>,
    },
}

impl Command {
    /// Whether this mode serves MCP over stdout.
    pub fn is_mcp(&self) -> bool {
        matches!(self, Self::Mcp { .. })
    }
}

/// Options of the interactive authorization flow.
#[derive(Debug, Clone, Default, Args)]
pub struct AuthArgs {
    /// Google "installed application" credentials JSON
    #[arg(long, env = "AGENDA_MCP_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Where to cache the OAuth token
    #[arg(long)]
    pub token_path: Option<PathBuf>,

    /// Loopback port for the authorization redirect
    #[arg(long)]
    pub port: Option<u16>,

    /// Print the consent URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,
}
