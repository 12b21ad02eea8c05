//! Command line for agenda-mcp
//!
//! This crate provides the `agenda-mcp` binary: browser authorization,
//! a text rendering of the agenda and the MCP tool server mode.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult, report};
