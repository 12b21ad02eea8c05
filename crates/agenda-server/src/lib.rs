//! MCP tool server for the daily agenda.
//!
//! This crate exposes the agenda as two Model Context Protocol tools:
//! - `get_todays_agenda` renders the current local day
//! - `get_agenda_for_date` renders a given `YYYY-MM-DD` day
//!
//! The handshake, tool listing and JSON-RPC framing are handled by `rmcp`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use agenda_providers::AgendaSource;
//! use agenda_server::ToolHandler;
//!
//! async fn serve(source: Arc<dyn AgendaSource>) -> agenda_server::ServerResult<()> {
//!     ToolHandler::new(source).serve_stdio().await
//! }
//! ```

mod error;
mod handler;

pub use error::{ServerError, ServerResult};
pub use handler::{DATE_TOOL, DateRequest, SERVER_NAME, TODAY_TOOL, ToolHandler};
