//! Event colour categories.
//!
//! Google Calendar tags events with a numeric `colorId`. A [`ColorTable`]
//! maps these identifiers to a human label and a display indicator. The
//! table is built once at startup from a fixed category map plus the
//! provider's own colour definitions, and is never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A resolved colour category: a label and an emoji indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorLabel {
    /// Human-readable category name.
    pub label: String,
    /// Emoji shown next to the event.
    pub indicator: String,
}

impl ColorLabel {
    /// Creates a new colour label.
    pub fn new(label: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            indicator: indicator.into(),
        }
    }
}

impl Default for ColorLabel {
    fn default() -> Self {
        Self::new("Default", "⚪")
    }
}

/// Category names for the event colour identifiers in use on the calendar.
const CATEGORIES: &[(&str, &str, &str)] = &[
    ("1", "Lavender", "🟣"),
    ("2", "Focus Time", "🟢"),
    ("3", "Internal Group Meetings", "🟣"),
    ("4", "External Meetings", "🔴"),
    ("5", "1:1", "🟡"),
    ("6", "Estaff", "🔴"),
    ("7", "Personal", "🔵"),
    ("8", "Reminders", "⚫"),
    ("9", "Travel", "🟠"),
    ("10", "NotWorking", "🟢"),
    ("11", "External Meetings", "🔴"),
];

/// Immutable lookup from provider colour identifier to [`ColorLabel`].
#[derive(Debug, Clone)]
pub struct ColorTable {
    categories: BTreeMap<String, ColorLabel>,
    /// Provider colour definitions: identifier to background hex colour.
    definitions: BTreeMap<String, String>,
}

impl Default for ColorTable {
    fn default() -> Self {
        let categories = CATEGORIES
            .iter()
            .map(|(id, label, indicator)| (id.to_string(), ColorLabel::new(*label, *indicator)))
            .collect();

        Self {
            categories,
            definitions: BTreeMap::new(),
        }
    }
}

impl ColorTable {
    /// Creates a table with the built-in categories and the given provider
    /// definitions (identifier to background hex colour).
    pub fn with_definitions(definitions: BTreeMap<String, String>) -> Self {
        Self {
            definitions,
            ..Self::default()
        }
    }

    /// Number of provider colour definitions known to this table.
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Resolves a colour identifier to a label.
    ///
    /// Lookup order: built-in category, provider definition (labelled
    /// `Category N`), then a generic `Color N` fallback. An absent or empty
    /// identifier resolves to the default label.
    pub fn resolve(&self, color_id: Option<&str>) -> ColorLabel {
        let id = match color_id {
            Some(id) if !id.is_empty() => id,
            _ => return ColorLabel::default(),
        };

        if let Some(label) = self.categories.get(id) {
            return label.clone();
        }

        if let Some(background) = self.definitions.get(id) {
            return ColorLabel::new(format!("Category {id}"), indicator_for_hex(background));
        }

        ColorLabel::new(format!("Color {id}"), "🎨")
    }
}

/// Picks a rough emoji for a hex colour such as `#a4bdfc`.
///
/// Matching is case-sensitive. The provider always sends lowercase hex, and
/// anything else falls through to 🎨.
pub fn indicator_for_hex(hex: &str) -> &'static str {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    let Some(first) = hex.chars().next() else {
        return "⚪";
    };

    match first {
        'd' | 'e' | 'f' => {
            if hex.contains(['0', '1', '2']) {
                "🔴"
            } else {
                "🟡"
            }
        }
        'a' | 'b' | 'c' => "🟢",
        '7' | '8' | '9' => "🔵",
        '4' | '5' | '6' => "🟣",
        '1' | '2' | '3' => "⚫",
        _ => "🎨",
    }
}
