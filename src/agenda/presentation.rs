use std::io;
use std::process::Command;

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::agenda::builder::{walk, Flow};
use crate::agenda::AgendaSnapshot;
use crate::calendar::CalendarEvent;
use crate::storage::config::AgendaConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum AgendaEntry {
    DateHeader { date: NaiveDate, label: String },
    Event(EventEntry),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventEntry {
    pub event_id: String,
    /// `None` for all-day events.
    pub time_label: Option<String>,
    pub title: String,
    pub color: Option<String>,
    pub tooltip: String,
    pub link: Option<EventLink>,
}

/// Click target for a single event. Owns its URL outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLink {
    url: String,
}

impl EventLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn open(&self) -> io::Result<()> {
        let opener = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
        tracing::info!("Opening event link: {}", self.url);
        Command::new(opener).arg(&self.url).spawn().map(|_| ())
    }
}

#[derive(Debug, Clone)]
pub struct PresentationOptions {
    /// Date already shown by the clock; no header is emitted for it.
    pub today: NaiveDate,
    pub date_format: String,
    pub event_time_format: String,
    pub style_calendar_colors: bool,
    pub max_rows: Option<usize>,
}

impl PresentationOptions {
    pub fn from_config(config: &AgendaConfig, today: NaiveDate, style_calendar_colors: bool) -> Self {
        Self {
            today,
            date_format: config.clock_date_format.clone(),
            event_time_format: config.event_time_format.clone(),
            style_calendar_colors,
            max_rows: config.max_rows,
        }
    }
}

/// Turns a snapshot into display rows: a header per new day and one row
/// per event.
pub fn build_entries(snapshot: &AgendaSnapshot, options: &PresentationOptions) -> Vec<AgendaEntry> {
    let row_limit = options.max_rows.unwrap_or(usize::MAX);

    // Both callbacks push into the same list, so route them through a cell.
    let rows = std::cell::RefCell::new(Vec::new());

    walk(
        snapshot,
        |date| {
            if date == options.today {
                return Flow::Continue;
            }
            let mut rows = rows.borrow_mut();
            // Leave room for at least one event under the header.
            if rows.len() + 2 > row_limit {
                return Flow::Stop;
            }
            rows.push(AgendaEntry::DateHeader {
                date,
                label: date.format(&options.date_format).to_string(),
            });
            Flow::Continue
        },
        |event| {
            let mut rows = rows.borrow_mut();
            if rows.len() >= row_limit {
                return Flow::Stop;
            }
            rows.push(AgendaEntry::Event(event_entry(event, options)));
            Flow::Continue
        },
    );

    rows.into_inner()
}

fn event_entry(event: &CalendarEvent, options: &PresentationOptions) -> EventEntry {
    let time_label = event
        .start
        .timed()
        .map(|start| start.format(&options.event_time_format).to_string());

    let color = if options.style_calendar_colors {
        event.color.clone()
    } else {
        None
    };

    EventEntry {
        event_id: event.id.clone(),
        time_label,
        title: event.display_title().to_string(),
        color,
        tooltip: tooltip_text(event),
        link: event.html_link.as_deref().map(EventLink::new),
    }
}

fn tooltip_text(event: &CalendarEvent) -> String {
    let location = event.location.as_deref().unwrap_or("(No location)");
    let mut tooltip = format!("Location: {}", location);
    if let Some(organizer) = &event.organizer {
        tooltip.push_str(&format!("\nOrganizer: {}", organizer));
    }
    tooltip
}

/// Current time and date labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockFace {
    pub time: String,
    pub date: String,
}

impl ClockFace {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>, config: &AgendaConfig) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            time: now.format(&config.clock_time_format).to_string(),
            date: now.format(&config.clock_date_format).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventStart, EventStatus};
    use chrono::{FixedOffset, Utc};
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn create_event(id: &str, start: EventStart) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            calendar_id: "primary".to_string(),
            title: Some(format!("Event {}", id)),
            location: None,
            organizer: None,
            html_link: None,
            start,
            status: EventStatus::Confirmed,
            color: Some("#9fc6e7".to_string()),
            reminders: vec![],
        }
    }

    fn timed(id: &str, start: &str) -> CalendarEvent {
        create_event(id, EventStart::DateTime(DateTime::parse_from_rfc3339(start).unwrap()))
    }

    fn options(today: NaiveDate) -> PresentationOptions {
        PresentationOptions::from_config(&AgendaConfig::default(), today, true)
    }

    fn snapshot(events: Vec<CalendarEvent>) -> AgendaSnapshot {
        AgendaSnapshot::from_events(events, Utc::now())
    }

    fn headers(entries: &[AgendaEntry]) -> Vec<String> {
        entries
            .iter()
            .filter_map(|entry| match entry {
                AgendaEntry::DateHeader { label, .. } => Some(label.clone()),
                AgendaEntry::Event(_) => None,
            })
            .collect()
    }

    #[test]
    fn today_header_is_suppressed() {
        let snapshot = snapshot(vec![
            timed("a", "2024-01-01T09:00:00Z"),
            timed("b", "2024-01-02T09:00:00Z"),
        ]);

        let entries = build_entries(&snapshot, &options(date(2024, 1, 1)));

        assert_eq!(entries.len(), 3);
        assert_eq!(headers(&entries), vec!["Tuesday, January 2, 2024".to_string()]);
        assert!(matches!(entries[0], AgendaEntry::Event(_)));
    }

    #[test]
    fn event_entry_formats_time_and_title() {
        let snapshot = snapshot(vec![timed("a", "2019-03-21T14:05:00-07:00")]);

        let entries = build_entries(&snapshot, &options(date(2019, 3, 21)));

        let AgendaEntry::Event(entry) = &entries[0] else {
            panic!("expected event entry");
        };
        assert_eq!(entry.time_label.as_deref(), Some("2:05"));
        assert_eq!(entry.title, "Event a");
        assert_eq!(entry.color.as_deref(), Some("#9fc6e7"));
    }

    #[test]
    fn all_day_event_has_no_time_label() {
        let snapshot = snapshot(vec![create_event("h", EventStart::Date(date(2024, 1, 1)))]);

        let entries = build_entries(&snapshot, &options(date(2024, 1, 1)));

        let AgendaEntry::Event(entry) = &entries[0] else {
            panic!("expected event entry");
        };
        assert_eq!(entry.time_label, None);
    }

    #[test]
    fn colors_dropped_when_styling_disabled() {
        let snapshot = snapshot(vec![timed("a", "2024-01-01T09:00:00Z")]);
        let mut options = options(date(2024, 1, 1));
        options.style_calendar_colors = false;

        let entries = build_entries(&snapshot, &options);

        let AgendaEntry::Event(entry) = &entries[0] else {
            panic!("expected event entry");
        };
        assert_eq!(entry.color, None);
    }

    #[test]
    fn tooltip_includes_location_and_organizer() {
        let mut event = timed("a", "2024-01-01T09:00:00Z");
        event.location = Some("Conference Room".to_string());
        event.organizer = Some("Ada Lovelace".to_string());

        assert_eq!(tooltip_text(&event), "Location: Conference Room\nOrganizer: Ada Lovelace");
    }

    #[test]
    fn tooltip_without_location_or_organizer() {
        let event = timed("a", "2024-01-01T09:00:00Z");

        assert_eq!(tooltip_text(&event), "Location: (No location)");
    }

    #[test]
    fn link_carries_event_url() {
        let mut event = timed("a", "2024-01-01T09:00:00Z");
        event.html_link = Some("https://www.google.com/calendar/event?eid=abc".to_string());

        let entries = build_entries(&snapshot(vec![event]), &options(date(2024, 1, 1)));

        let AgendaEntry::Event(entry) = &entries[0] else {
            panic!("expected event entry");
        };
        assert_eq!(
            entry.link.as_ref().map(EventLink::url),
            Some("https://www.google.com/calendar/event?eid=abc")
        );
    }

    #[test]
    fn max_rows_truncates_agenda() {
        let snapshot = snapshot(vec![
            timed("a", "2024-01-02T09:00:00Z"),
            timed("b", "2024-01-02T10:00:00Z"),
            timed("c", "2024-01-03T09:00:00Z"),
        ]);
        let mut options = options(date(2024, 1, 1));
        options.max_rows = Some(3);

        let entries = build_entries(&snapshot, &options);

        assert_eq!(entries.len(), 3);
        assert_eq!(headers(&entries), vec!["Tuesday, January 2, 2024".to_string()]);
    }

    #[test]
    fn header_not_emitted_without_room_for_an_event() {
        let snapshot = snapshot(vec![
            timed("a", "2024-01-02T09:00:00Z"),
            timed("b", "2024-01-03T09:00:00Z"),
        ]);
        let mut options = options(date(2024, 1, 1));
        options.max_rows = Some(3);

        let entries = build_entries(&snapshot, &options);

        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn clock_face_uses_configured_formats() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let now = offset.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();

        let clock = ClockFace::at(&now, &AgendaConfig::default());

        assert_eq!(clock.time, "2:07 PM");
        assert_eq!(clock.date, "Tuesday, March 5, 2024");
    }
}
