use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::agenda::{
    build_entries, next_due, truncate_to_minute, AgendaEntry, AgendaSnapshot, ClockFace,
    PresentationOptions,
};
use crate::calendar::CalendarEvent;
use crate::storage::config::Config;
use crate::storage::preferences::Preferences;
use crate::sync::{AgendaSync, CalendarApi};

/// Longest stretch of missed minutes still scanned for reminders, e.g.
/// after the machine wakes from sleep.
const MAX_REMINDER_CATCH_UP_MINUTES: i64 = 5;

/// What changed during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub clock: ClockFace,
    /// Rebuilt rows, present only when the agenda refreshed this tick.
    pub agenda: Option<Vec<AgendaEntry>>,
    pub reminder: Option<CalendarEvent>,
}

/// Drives the clock, agenda refresh and reminder scan from a once-a-second
/// tick.
pub struct AgendaApp<A: CalendarApi> {
    config: Config,
    preferences: Preferences,
    sync: AgendaSync<A>,
    entries: Vec<AgendaEntry>,
    last_refresh_slot: Option<i64>,
    last_scanned_minute: Option<DateTime<Utc>>,
    refresh_requested: bool,
}

impl<A: CalendarApi> AgendaApp<A> {
    pub fn new(config: Config, preferences: Preferences, sync: AgendaSync<A>) -> Self {
        Self {
            config,
            preferences,
            sync,
            entries: Vec::new(),
            last_refresh_slot: None,
            last_scanned_minute: None,
            refresh_requested: true,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Swaps in new preferences and refreshes on the next tick.
    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
        self.refresh_requested = true;
    }

    pub fn force_refresh(&mut self) {
        self.refresh_requested = true;
    }

    pub fn entries(&self) -> &[AgendaEntry] {
        &self.entries
    }

    pub fn snapshot(&self) -> Arc<AgendaSnapshot> {
        self.sync.snapshot()
    }

    pub async fn tick<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> TickOutcome
    where
        Tz::Offset: std::fmt::Display,
    {
        let clock = ClockFace::at(&now, &self.config.agenda);
        let now_utc = now.with_timezone(&Utc);

        let agenda = if self.refresh_due(now_utc) {
            Some(self.refresh(&now).await)
        } else {
            None
        };

        let reminder = self.scan_reminders(now_utc);

        TickOutcome { clock, agenda, reminder }
    }

    fn refresh_slot(&self, now: DateTime<Utc>) -> i64 {
        let interval_secs = i64::from(self.config.agenda.refresh_interval_minutes.max(1)) * 60;
        now.timestamp().div_euclid(interval_secs)
    }

    fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        self.refresh_requested || self.last_refresh_slot != Some(self.refresh_slot(now))
    }

    async fn refresh<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Vec<AgendaEntry> {
        let now_utc = now.with_timezone(&Utc);
        let snapshot = self.sync
            .refresh_at(
                now_utc,
                self.preferences.query_days(),
                self.preferences.query_limit(),
            )
            .await;

        self.last_refresh_slot = Some(self.refresh_slot(now_utc));
        self.refresh_requested = false;

        let options = PresentationOptions::from_config(
            &self.config.agenda,
            now.date_naive(),
            self.preferences.style_calendar_colors(),
        );
        self.entries = build_entries(&snapshot, &options);
        self.entries.clone()
    }

    fn scan_reminders(&mut self, now: DateTime<Utc>) -> Option<CalendarEvent> {
        let now_minute = truncate_to_minute(now);
        let earliest = now_minute - Duration::minutes(MAX_REMINDER_CATCH_UP_MINUTES);
        let after = match self.last_scanned_minute {
            Some(last) if last >= now_minute => return None,
            Some(last) => last.max(earliest),
            None => now_minute - Duration::minutes(1),
        };

        // Resume from the fired reminder's minute so later ones in the
        // window still fire on following ticks.
        let snapshot = self.sync.snapshot();
        match next_due(&snapshot, after, now_minute) {
            Some((trigger, event)) => {
                self.last_scanned_minute = Some(trigger);
                tracing::info!("Reminder due for {} ({})", event.display_title(), event.id);
                Some(event.clone())
            }
            None => {
                self.last_scanned_minute = Some(now_minute);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarSource, ColorPalette, EventStart, EventStatus, ReminderRule};
    use crate::sync::google_api::{EventPage, MockCalendarApi};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, second).unwrap()
    }

    fn standup() -> CalendarEvent {
        CalendarEvent {
            id: "standup".to_string(),
            calendar_id: "work".to_string(),
            title: Some("Standup".to_string()),
            location: None,
            organizer: None,
            html_link: None,
            start: EventStart::DateTime(at(10, 0, 0).fixed_offset()),
            status: EventStatus::Confirmed,
            color: None,
            reminders: vec![],
        }
    }

    fn mock_api(refreshes: Arc<AtomicUsize>) -> MockCalendarApi {
        let mut api = MockCalendarApi::new();
        api.expect_fetch_colors().returning(|| Ok(ColorPalette::default()));
        api.expect_list_calendars().returning(move || {
            refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CalendarSource {
                id: "work".to_string(),
                summary: "Work".to_string(),
                selected: true,
                color_id: None,
            }])
        });
        api.expect_list_events().returning(|_, _, _| {
            Ok(EventPage {
                events: vec![standup()],
                default_reminders: vec![ReminderRule::popup(15)],
            })
        });
        api
    }

    async fn app(refreshes: Arc<AtomicUsize>) -> AgendaApp<MockCalendarApi> {
        let sync = AgendaSync::new(mock_api(refreshes)).await;
        AgendaApp::new(Config::default(), Preferences::default(), sync)
    }

    #[tokio::test]
    async fn first_tick_refreshes_and_renders() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut app = app(Arc::clone(&refreshes)).await;

        let outcome = app.tick(at(9, 0, 0)).await;

        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.clock.time, "9:00 AM");
        let entries = outcome.agenda.expect("agenda refreshed");
        assert_eq!(entries.len(), 1);
        assert_eq!(app.entries(), entries.as_slice());
    }

    #[tokio::test]
    async fn refreshes_once_per_interval_slot() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut app = app(Arc::clone(&refreshes)).await;

        app.tick(at(9, 0, 0)).await;
        let quiet = app.tick(at(9, 14, 59)).await;
        let next = app.tick(at(9, 15, 3)).await;

        assert!(quiet.agenda.is_none());
        assert!(next.agenda.is_some());
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forced_refresh_happens_on_next_tick() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut app = app(Arc::clone(&refreshes)).await;

        app.tick(at(9, 0, 0)).await;
        app.force_refresh();
        let outcome = app.tick(at(9, 0, 1)).await;

        assert!(outcome.agenda.is_some());
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reminder_fires_once_in_its_minute() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut app = app(refreshes).await;

        app.tick(at(9, 44, 30)).await;
        let due = app.tick(at(9, 45, 0)).await;
        let same_minute = app.tick(at(9, 45, 1)).await;

        assert_eq!(due.reminder.map(|e| e.id), Some("standup".to_string()));
        assert!(same_minute.reminder.is_none());
    }

    #[tokio::test]
    async fn late_tick_still_fires_skipped_reminder() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut app = app(refreshes).await;

        app.tick(at(9, 44, 0)).await;
        let late = app.tick(at(9, 46, 2)).await;

        assert_eq!(late.reminder.map(|e| e.id), Some("standup".to_string()));
    }

    #[tokio::test]
    async fn late_tick_fires_each_reminder_in_window_in_turn() {
        let mut api = MockCalendarApi::new();
        api.expect_fetch_colors().returning(|| Ok(ColorPalette::default()));
        api.expect_list_calendars().returning(|| {
            Ok(vec![CalendarSource {
                id: "work".to_string(),
                summary: "Work".to_string(),
                selected: true,
                color_id: None,
            }])
        });
        api.expect_list_events().returning(|_, _, _| {
            let mut later = standup();
            later.id = "review".to_string();
            later.start = EventStart::DateTime(at(10, 2, 0).fixed_offset());
            Ok(EventPage {
                events: vec![standup(), later],
                default_reminders: vec![ReminderRule::popup(15)],
            })
        });
        let sync = AgendaSync::new(api).await;
        let mut app = AgendaApp::new(Config::default(), Preferences::default(), sync);

        app.tick(at(9, 44, 0)).await;
        let first = app.tick(at(9, 47, 5)).await;
        let second = app.tick(at(9, 47, 6)).await;
        let quiet = app.tick(at(9, 48, 0)).await;

        assert_eq!(first.reminder.map(|e| e.id), Some("standup".to_string()));
        assert_eq!(second.reminder.map(|e| e.id), Some("review".to_string()));
        assert!(quiet.reminder.is_none());
    }

    #[tokio::test]
    async fn stale_reminders_beyond_catch_up_are_dropped() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut app = app(refreshes).await;

        app.tick(at(9, 30, 0)).await;
        let after_sleep = app.tick(at(9, 55, 0)).await;

        assert!(after_sleep.reminder.is_none());
    }

    #[tokio::test]
    async fn new_preferences_trigger_refresh() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut app = app(Arc::clone(&refreshes)).await;
        app.tick(at(9, 0, 0)).await;

        let mut prefs = Preferences::default();
        prefs.set_style_calendar_colors(false);
        app.set_preferences(prefs);
        let outcome = app.tick(at(9, 0, 1)).await;

        assert!(outcome.agenda.is_some());
        assert!(!app.preferences().style_calendar_colors());
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }
}
