//! Authorization and calendar access for agenda-mcp.
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────────┐
//! │ credentials.json │     │ client_id / secret  │
//! └────────┬─────────┘     └──────────┬──────────┘
//!          │ acquire_interactive      │ acquire_from_environment
//!          ▼                          ▼
//!   ┌──────────────┐           ┌──────────────┐
//!   │ TokenStore / │           │  TokenStore  │
//!   │ browser flow │           │  (read only) │
//!   └──────┬───────┘           └──────┬───────┘
//!          └────────────┬─────────────┘
//!                       ▼
//!              ┌──────────────────┐
//!              │ AuthorizedClient │
//!              └────────┬─────────┘
//!                       ▼
//!              ┌──────────────────┐
//!              │  AgendaService   │──▶ Vec<AgendaEvent>
//!              └──────────────────┘
//! ```

pub mod error;
pub mod google;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use google::{AgendaSource, BoxFuture};
