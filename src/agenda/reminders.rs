use chrono::{DateTime, Duration, DurationRound, Utc};

use crate::agenda::AgendaSnapshot;
use crate::calendar::{CalendarEvent, ReminderRule};

/// Truncates `instant` to the start of its minute.
pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(Duration::minutes(1))
        .unwrap_or(instant)
}

/// Returns the first event with a popup reminder due at exactly `now_minute`.
pub fn scan(snapshot: &AgendaSnapshot, now_minute: DateTime<Utc>) -> Option<&CalendarEvent> {
    let now_minute = truncate_to_minute(now_minute);
    scan_between(snapshot, now_minute - Duration::minutes(1), now_minute)
}

/// Returns the event whose popup reminder is due earliest in
/// `(after, until]`. Ties go to the first event in snapshot order.
pub fn scan_between(
    snapshot: &AgendaSnapshot,
    after: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Option<&CalendarEvent> {
    next_due(snapshot, after, until).map(|(_, event)| event)
}

/// Like [`scan_between`], but also returns the trigger minute so a caller
/// can resume scanning right after it and still fire later reminders in the
/// same window.
pub fn next_due(
    snapshot: &AgendaSnapshot,
    after: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Option<(DateTime<Utc>, &CalendarEvent)> {
    let after = truncate_to_minute(after);
    let until = truncate_to_minute(until);
    if until <= after {
        return None;
    }

    snapshot
        .iter()
        .filter_map(|event| {
            let start = event.start.timed()?.with_timezone(&Utc);
            event
                .reminders
                .iter()
                .filter(|rule| rule.is_actionable())
                .filter_map(|rule| trigger_minute(start, rule))
                .filter(|trigger| after < *trigger && *trigger <= until)
                .min()
                .map(|trigger| (trigger, event))
        })
        .min_by_key(|(trigger, _)| *trigger)
}

/// Minute at which `rule` fires for an event starting at `start`, or `None`
/// when the offset falls outside the representable range.
fn trigger_minute(start: DateTime<Utc>, rule: &ReminderRule) -> Option<DateTime<Utc>> {
    let offset = Duration::try_minutes(rule.minutes_before)?;
    start.checked_sub_signed(offset).map(truncate_to_minute)
}
