//! Core types: agenda events, colour labels, dates, formatting, tracing

pub mod colors;
pub mod event;
pub mod format;
pub mod time;
pub mod tracing;

pub use colors::{ColorLabel, ColorTable};
pub use event::AgendaEvent;
pub use format::{AgendaHeading, render_agenda, truncate_description};
pub use time::{DateError, day_bounds, parse_agenda_date};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
