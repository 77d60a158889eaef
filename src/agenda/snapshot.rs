use chrono::{DateTime, Utc};

use crate::calendar::CalendarEvent;

/// Result of one refresh cycle, ordered by effective start.
///
/// Snapshots are never mutated after construction. Holders share them
/// through `Arc` and a refresh swaps in a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct AgendaSnapshot {
    events: Vec<CalendarEvent>,
    fetched_at: DateTime<Utc>,
}

impl AgendaSnapshot {
    /// Sorts `events` by effective start. The sort is stable, so events with
    /// identical starts keep the order they were fetched in.
    pub fn from_events(mut events: Vec<CalendarEvent>, fetched_at: DateTime<Utc>) -> Self {
        events.sort_by_key(|event| event.effective_start());
        Self { events, fetched_at }
    }

    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self {
            events: Vec::new(),
            fetched_at,
        }
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CalendarEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl<'a> IntoIterator for &'a AgendaSnapshot {
    type Item = &'a CalendarEvent;
    type IntoIter = std::slice::Iter<'a, CalendarEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
