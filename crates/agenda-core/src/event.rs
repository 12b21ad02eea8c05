//! Agenda event model.
//!
//! An [`AgendaEvent`] is the shaped, display-ready form of a calendar entry
//! for a single day. Providers build these; the formatter renders them.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::colors::ColorLabel;

/// A single calendar entry on a day's agenda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaEvent {
    /// Event title (may be empty for untitled events).
    pub title: String,
    /// Start time, `None` for all-day events.
    pub start: Option<DateTime<FixedOffset>>,
    /// End time, `None` for all-day events.
    pub end: Option<DateTime<FixedOffset>>,
    /// Event location, if any.
    pub location: Option<String>,
    /// Event description, if any.
    pub description: Option<String>,
    /// Resolved colour category.
    pub color: ColorLabel,
    /// Whether the event spans the whole day.
    pub is_all_day: bool,
}

impl AgendaEvent {
    /// Creates a timed event.
    pub fn timed(
        title: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: Option<DateTime<FixedOffset>>,
    ) -> Self {
        Self {
            title: title.into(),
            start: Some(start),
            end,
            location: None,
            description: None,
            color: ColorLabel::default(),
            is_all_day: false,
        }
    }

    /// Creates an all-day event.
    pub fn all_day(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start: None,
            end: None,
            location: None,
            description: None,
            color: ColorLabel::default(),
            is_all_day: true,
        }
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the colour label.
    pub fn with_color(mut self, color: ColorLabel) -> Self {
        self.color = color;
        self
    }

    /// Start time formatted as `HH:MM` in the event's own offset.
    pub fn start_label(&self) -> Option<String> {
        self.start.map(|t| t.format("%H:%M").to_string())
    }

    /// End time formatted as `HH:MM` in the event's own offset.
    pub fn end_label(&self) -> Option<String> {
        self.end.map(|t| t.format("%H:%M").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_labels_use_event_offset() {
        let start = DateTime::parse_from_rfc3339("2024-12-25T09:30:00-05:00").unwrap();
        let end = DateTime::parse_from_rfc3339("2024-12-25T10:15:00-05:00").unwrap();
        let event = AgendaEvent::timed("Standup", start, Some(end));

        assert_eq!(event.start_label().as_deref(), Some("09:30"));
        assert_eq!(event.end_label().as_deref(), Some("10:15"));
        assert!(!event.is_all_day);
    }

    #[test]
    fn all_day_has_no_times() {
        let event = AgendaEvent::all_day("Holiday").with_location("Home");
        assert!(event.is_all_day);
        assert!(event.start_label().is_none());
        assert_eq!(event.location.as_deref(), Some("Home"));
    }
}
