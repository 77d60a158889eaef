use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "(No title)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub calendar_id: String,
    pub title: Option<String>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    pub html_link: Option<String>,
    pub start: EventStart,
    pub status: EventStatus,
    pub color: Option<String>,
    pub reminders: Vec<ReminderRule>,
}

/// Start of an event: a zoned timestamp, or a bare date for all-day events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStart {
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRule {
    pub method: ReminderMethod,
    pub minutes_before: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReminderMethod {
    Email,
    Popup,
    Other(String),
}

impl EventStart {
    /// Instant used to order events. All-day events sort at the start of
    /// their date in UTC.
    pub fn effective_start(&self) -> DateTime<Utc> {
        match self {
            EventStart::DateTime(dt) => dt.with_timezone(&Utc),
            EventStart::Date(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Wall-clock date of the start, in the event's own offset.
    pub fn calendar_day(&self) -> NaiveDate {
        match self {
            EventStart::DateTime(dt) => dt.date_naive(),
            EventStart::Date(date) => *date,
        }
    }

    pub fn timed(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            EventStart::DateTime(dt) => Some(*dt),
            EventStart::Date(_) => None,
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, EventStart::Date(_))
    }
}

impl EventStatus {
    pub fn from_api(status: Option<&str>) -> Self {
        match status {
            Some("tentative") => EventStatus::Tentative,
            Some("cancelled") => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        }
    }
}

impl ReminderMethod {
    pub fn from_api(method: &str) -> Self {
        match method {
            "popup" => ReminderMethod::Popup,
            "email" => ReminderMethod::Email,
            other => ReminderMethod::Other(other.to_string()),
        }
    }
}

impl ReminderRule {
    pub fn popup(minutes_before: i64) -> Self {
        Self {
            method: ReminderMethod::Popup,
            minutes_before,
        }
    }

    /// Only popup reminders with a positive offset ever fire.
    pub fn is_actionable(&self) -> bool {
        self.method == ReminderMethod::Popup && self.minutes_before > 0
    }
}

impl CalendarEvent {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn effective_start(&self) -> DateTime<Utc> {
        self.start.effective_start()
    }

    pub fn calendar_day(&self) -> NaiveDate {
        self.start.calendar_day()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn timed(rfc3339: &str) -> EventStart {
        EventStart::DateTime(DateTime::parse_from_rfc3339(rfc3339).unwrap())
    }

    fn create_test_event(title: Option<&str>, start: EventStart) -> CalendarEvent {
        CalendarEvent {
            id: "test_id".to_string(),
            calendar_id: "primary".to_string(),
            title: title.map(String::from),
            location: None,
            organizer: None,
            html_link: None,
            start,
            status: EventStatus::Confirmed,
            color: None,
            reminders: vec![],
        }
    }

    #[test]
    fn missing_title_displays_default() {
        let event = create_test_event(None, EventStart::Date(date(2024, 1, 1)));

        assert_eq!(event.display_title(), "(No title)");
    }

    #[test]
    fn present_title_is_displayed() {
        let event = create_test_event(Some("Standup"), EventStart::Date(date(2024, 1, 1)));

        assert_eq!(event.display_title(), "Standup");
    }

    #[test]
    fn all_day_start_is_midnight_utc() {
        let start = EventStart::Date(date(2024, 3, 5));

        assert_eq!(start.effective_start().to_rfc3339(), "2024-03-05T00:00:00+00:00");
    }

    #[test]
    fn timed_start_converts_to_utc() {
        let start = timed("2019-03-21T10:00:00-07:00");

        assert_eq!(start.effective_start().to_rfc3339(), "2019-03-21T17:00:00+00:00");
    }

    #[test]
    fn calendar_day_uses_event_offset() {
        let start = timed("2024-01-01T20:00:00-07:00");

        assert_eq!(start.calendar_day(), date(2024, 1, 1));
    }

    #[test]
    fn all_day_sorts_before_timed_event_on_same_utc_day() {
        let all_day = EventStart::Date(date(2024, 1, 1));
        let morning = timed("2024-01-01T08:00:00Z");

        assert!(all_day.effective_start() < morning.effective_start());
    }

    #[test]
    fn unknown_status_is_confirmed() {
        assert_eq!(EventStatus::from_api(Some("weird")), EventStatus::Confirmed);
        assert_eq!(EventStatus::from_api(None), EventStatus::Confirmed);
        assert_eq!(EventStatus::from_api(Some("cancelled")), EventStatus::Cancelled);
    }

    #[test]
    fn only_positive_popup_reminders_are_actionable() {
        assert!(ReminderRule::popup(10).is_actionable());
        assert!(!ReminderRule::popup(0).is_actionable());
        assert!(!ReminderRule::popup(-5).is_actionable());

        let email = ReminderRule {
            method: ReminderMethod::from_api("email"),
            minutes_before: 10,
        };
        assert!(!email.is_actionable());
    }
}
