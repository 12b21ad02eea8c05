//! Plain-text agenda rendering.
//!
//! Produces the daily agenda report shared by the text mode and the MCP
//! tools:
//!
//! ```text
//! 📅 Daily Agenda for Wednesday, December 25, 2024
//! ==================================================
//!
//! 1. 🕐 09:00 - 10:00 | Standup 🟢 Focus Time
//!    📍 Room 4
//! ```

use std::borrow::Cow;
use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::event::AgendaEvent;

/// Maximum description length (in characters) before truncation.
const MAX_DESCRIPTION_CHARS: usize = 100;

/// Width of the rule under the heading.
const RULE_WIDTH: usize = 50;

/// Which day the agenda is for; controls the empty-day wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgendaHeading {
    /// The current local day.
    Today(NaiveDate),
    /// An explicitly requested day.
    Date(NaiveDate),
}

impl AgendaHeading {
    /// The date this heading refers to.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Today(date) | Self::Date(date) => *date,
        }
    }

    fn empty_message(&self) -> &'static str {
        match self {
            Self::Today(_) => "🎉 No events scheduled for today!",
            Self::Date(_) => "🎉 No events scheduled for this day!",
        }
    }
}

/// Renders a day's events as the agenda report.
pub fn render_agenda(heading: AgendaHeading, events: &[AgendaEvent]) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "📅 Daily Agenda for {}",
        heading.date().format("%A, %B %-d, %Y")
    );
    output.push_str(&"=".repeat(RULE_WIDTH));
    output.push_str("\n\n");

    if events.is_empty() {
        output.push_str(heading.empty_message());
        return output;
    }

    for (index, event) in events.iter().enumerate() {
        let _ = write!(output, "{}. ", index + 1);
        let color = &event.color;

        match event.start_label() {
            Some(start) if !event.is_all_day => {
                let _ = write!(output, "🕐 {start}");
                if let Some(end) = event.end_label()
                    && end != start
                {
                    let _ = write!(output, " - {end}");
                }
                let _ = writeln!(
                    output,
                    " | {} {} {}",
                    event.title, color.indicator, color.label
                );
            }
            _ => {
                let _ = writeln!(
                    output,
                    "🗓️  {} (All day) {} {}",
                    event.title, color.indicator, color.label
                );
            }
        }

        if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
            let _ = writeln!(output, "   📍 {location}");
        }

        if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(output, "   📝 {}", truncate_description(description));
        }

        output.push('\n');
    }

    output
}

/// Truncates a description to 100 characters, appending `...` when cut.
pub fn truncate_description(description: &str) -> Cow<'_, str> {
    if description.chars().count() <= MAX_DESCRIPTION_CHARS {
        return Cow::Borrowed(description);
    }

    let truncated: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
    Cow::Owned(format!("{truncated}..."))
}
