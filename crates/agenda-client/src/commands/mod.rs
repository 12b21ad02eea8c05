//! Command implementations.

pub mod auth;
pub mod mcp;
pub mod text;
