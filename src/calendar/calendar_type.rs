use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A calendar from the user's calendar list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSource {
    pub id: String,
    pub summary: String,
    pub selected: bool,
    pub color_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorDefinition {
    pub background: Option<String>,
    pub foreground: Option<String>,
}

/// Calendar color ids mapped to their display colors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    calendar: HashMap<String, ColorDefinition>,
}

impl ColorPalette {
    pub fn new(calendar: HashMap<String, ColorDefinition>) -> Self {
        Self { calendar }
    }

    pub fn is_empty(&self) -> bool {
        self.calendar.is_empty()
    }

    /// Background color for a calendar color id. Any miss is `None`.
    pub fn resolve(&self, color_id: Option<&str>) -> Option<String> {
        color_id
            .and_then(|id| self.calendar.get(id))
            .and_then(|def| def.background.clone())
    }
}
