use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::storage::ensure_private_dir;

pub const PREF_QUERY_DAYS: &str = "queryDays";
pub const PREF_QUERY_LIMIT: &str = "queryLimit";
pub const PREF_STYLE_CALENDAR_COLORS: &str = "styleCalendarColors";
pub const PREF_SCREEN_POSITION: &str = "screenPosition";

const QUERY_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=365;
const QUERY_LIMIT_RANGE: std::ops::RangeInclusive<i64> = 1..=50;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to access preferences file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Unknown preference: {0}")]
    UnknownKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenPosition {
    Left,
    Right,
}

impl FromStr for ScreenPosition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(ScreenPosition::Left),
            "right" => Ok(ScreenPosition::Right),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ScreenPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenPosition::Left => write!(f, "left"),
            ScreenPosition::Right => write!(f, "right"),
        }
    }
}

/// User settings. Setters silently keep the current value when handed
/// something out of range; compare before and after to detect a rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    query_days: u32,
    query_limit: u32,
    style_calendar_colors: bool,
    screen_position: ScreenPosition,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            query_days: 7,
            query_limit: 20,
            style_calendar_colors: true,
            screen_position: ScreenPosition::Right,
        }
    }
}

impl Preferences {
    pub fn query_days(&self) -> u32 {
        self.query_days
    }

    /// Accepts 1–365.
    pub fn set_query_days(&mut self, days: i64) {
        if QUERY_DAYS_RANGE.contains(&days) {
            self.query_days = days as u32;
        }
    }

    pub fn query_limit(&self) -> u32 {
        self.query_limit
    }

    /// Accepts 1–50.
    pub fn set_query_limit(&mut self, limit: i64) {
        if QUERY_LIMIT_RANGE.contains(&limit) {
            self.query_limit = limit as u32;
        }
    }

    pub fn style_calendar_colors(&self) -> bool {
        self.style_calendar_colors
    }

    pub fn set_style_calendar_colors(&mut self, enabled: bool) {
        self.style_calendar_colors = enabled;
    }

    pub fn screen_position(&self) -> ScreenPosition {
        self.screen_position
    }

    pub fn set_screen_position(&mut self, position: ScreenPosition) {
        self.screen_position = position;
    }

    /// Overlays a preferences document onto the current values. Missing keys
    /// and values of the wrong shape leave the field untouched.
    pub fn apply_json(&mut self, document: &Value) {
        if let Some(days) = document.get(PREF_QUERY_DAYS).and_then(int_value) {
            self.set_query_days(days);
        }
        if let Some(limit) = document.get(PREF_QUERY_LIMIT).and_then(int_value) {
            self.set_query_limit(limit);
        }
        if let Some(enabled) = document.get(PREF_STYLE_CALENDAR_COLORS).and_then(Value::as_bool) {
            self.set_style_calendar_colors(enabled);
        }
        if let Some(position) = document
            .get(PREF_SCREEN_POSITION)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
        {
            self.set_screen_position(position);
        }
    }

    /// Applies a single textual edit such as `queryDays=14`. Only an unknown
    /// key is an error; a bad value is ignored like any other setter input.
    pub fn apply(&mut self, key: &str, raw: &str) -> Result<(), PreferencesError> {
        let raw = raw.trim();
        match key {
            PREF_QUERY_DAYS => {
                if let Ok(days) = raw.parse() {
                    self.set_query_days(days);
                }
            }
            PREF_QUERY_LIMIT => {
                if let Ok(limit) = raw.parse() {
                    self.set_query_limit(limit);
                }
            }
            PREF_STYLE_CALENDAR_COLORS => {
                if let Ok(enabled) = raw.parse() {
                    self.set_style_calendar_colors(enabled);
                }
            }
            PREF_SCREEN_POSITION => {
                if let Ok(position) = raw.parse() {
                    self.set_screen_position(position);
                }
            }
            other => return Err(PreferencesError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads and writes `preferences.json`.
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads preferences over the built-in defaults. A missing file is a
    /// first run and gets the defaults written out.
    pub fn load(&self) -> Result<Preferences, PreferencesError> {
        let mut prefs = Preferences::default();
        self.load_into(&mut prefs)?;
        Ok(prefs)
    }

    /// Loads preferences over `prefs`, keeping its values for anything the
    /// file does not supply.
    pub fn load_into(&self, prefs: &mut Preferences) -> Result<(), PreferencesError> {
        if !self.path.exists() {
            tracing::info!("Creating new preferences file at {}", self.path.display());
            return self.save(prefs);
        }

        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&content) {
            Ok(document) => {
                prefs.apply_json(&document);
                tracing::info!("Loaded preferences from {}", self.path.display());
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable preferences file {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
        Ok(())
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            ensure_private_dir(parent)?;
        }

        let json = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, json)?;
        tracing::info!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}
