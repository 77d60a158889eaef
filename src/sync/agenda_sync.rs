use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::agenda::AgendaSnapshot;
use crate::calendar::{CalendarEvent, ColorPalette};
use crate::sync::google_api::{CalendarApi, QueryWindow};

/// Pulls events from every selected calendar into one sorted snapshot.
///
/// Remote failures never fail a refresh. A failed calendar list yields an
/// empty snapshot and a failed calendar contributes no events; both are
/// logged.
pub struct AgendaSync<A: CalendarApi> {
    api: A,
    palette: ColorPalette,
    snapshot: Arc<AgendaSnapshot>,
}

impl<A: CalendarApi> AgendaSync<A> {
    /// Fetches the color palette once. Without it, events carry no color.
    pub async fn new(api: A) -> Self {
        let palette = match api.fetch_colors().await {
            Ok(palette) => palette,
            Err(e) => {
                tracing::warn!("Failed to load calendar colors: {}", e);
                ColorPalette::default()
            }
        };

        Self {
            api,
            palette,
            snapshot: Arc::new(AgendaSnapshot::empty(Utc::now())),
        }
    }

    /// Most recent snapshot. Later refreshes do not change it.
    pub fn snapshot(&self) -> Arc<AgendaSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub async fn refresh(&mut self, window_days: u32, max_per_calendar: u32) -> Arc<AgendaSnapshot> {
        self.refresh_at(Utc::now(), window_days, max_per_calendar).await
    }

    pub async fn refresh_at(
        &mut self,
        now: DateTime<Utc>,
        window_days: u32,
        max_per_calendar: u32,
    ) -> Arc<AgendaSnapshot> {
        let window = QueryWindow::forward(now, window_days);

        let calendars = match self.api.list_calendars().await {
            Ok(calendars) => calendars,
            Err(e) => {
                tracing::warn!("Failed to load calendars: {}", e);
                Vec::new()
            }
        };

        let mut events: Vec<CalendarEvent> = Vec::new();
        for calendar in calendars.iter().filter(|c| c.selected) {
            let page = match self.api.list_events(&calendar.id, &window, max_per_calendar).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Failed to load events for {}: {}", calendar.id, e);
                    continue;
                }
            };

            let color = self.palette.resolve(calendar.color_id.as_deref());
            events.extend(page.events.into_iter().map(|mut event| {
                event.color = color.clone();
                event.reminders = page.default_reminders.clone();
                event
            }));
        }

        tracing::info!(
            "Refreshed agenda: {} events over {} days",
            events.len(),
            window_days
        );

        self.snapshot = Arc::new(AgendaSnapshot::from_events(events, now));
        self.snapshot()
    }
}
