use crate::calendar::{
    CalendarEvent, CalendarSource, ColorDefinition, ColorPalette, EventStart, EventStatus,
    ReminderMethod, ReminderRule,
};
use crate::storage::config::DEFAULT_API_BASE_URL;
use crate::sync::google_auth::{AuthError, CredentialProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Credential error: {0}")]
    Credentials(#[from] AuthError),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Query window `[start, end]` in UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    pub fn forward(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: now,
            end: now + Duration::hours(i64::from(days) * 24),
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Events of one calendar plus the reminders its events default to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub events: Vec<CalendarEvent>,
    pub default_reminders: Vec<ReminderRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    items: Option<Vec<GoogleCalendarListEntry>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCalendarListEntry {
    id: String,
    summary: Option<String>,
    color_id: Option<String>,
    #[serde(default)]
    selected: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    items: Option<Vec<GoogleEvent>>,
    default_reminders: Option<Vec<GoogleReminder>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: Option<String>,
    summary: Option<String>,
    location: Option<String>,
    start: GoogleDateTime,
    status: Option<String>,
    html_link: Option<String>,
    organizer: Option<GooglePerson>,
    creator: Option<GooglePerson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GooglePerson {
    display_name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleReminder {
    method: Option<String>,
    minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ColorsResponse {
    calendar: Option<HashMap<String, ColorDefinition>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_calendars(&self) -> Result<Vec<CalendarSource>, ApiError>;

    async fn list_events(
        &self,
        calendar_id: &str,
        window: &QueryWindow,
        max_results: u32,
    ) -> Result<EventPage, ApiError>;

    async fn fetch_colors(&self) -> Result<ColorPalette, ApiError>;
}

pub struct GoogleCalendarClient {
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
    timeout: std::time::Duration,
}

impl GoogleCalendarClient {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            credentials,
            client: reqwest::Client::new(),
            timeout: std::time::Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T, ApiError> {
        let token = self.credentials.access_token().await?;

        let response = self.client
            .get(url)
            .bearer_auth(&token)
            .timeout(self.timeout)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("GET {} -> {}", url, status);

        if status == 401 {
            tracing::error!("Authentication failed when fetching {}", resource);
            return Err(ApiError::AuthenticationFailed);
        }

        if status == 404 {
            tracing::error!("Not found: {}", resource);
            return Err(ApiError::NotFound(resource.to_string()));
        }

        if status == 429 {
            tracing::warn!("Rate limit exceeded");
            return Err(ApiError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await?;
            tracing::error!("Failed to fetch {}. Status: {}, Body: {}", resource, status, body);
            return Err(ApiError::RequestError(format!("Status {}: {}", status, body)));
        }

        Ok(response.json().await?)
    }

    fn convert_from_google_event(ge: GoogleEvent, calendar_id: &str) -> Result<CalendarEvent, ApiError> {
        let start = parse_start(&ge.start)?;

        let organizer = ge.organizer
            .or(ge.creator)
            .and_then(|person| person.display_name.or(person.email));

        Ok(CalendarEvent {
            id: ge.id.ok_or_else(|| ApiError::ParseError("Missing event id".to_string()))?,
            calendar_id: calendar_id.to_string(),
            title: ge.summary,
            location: ge.location,
            organizer,
            html_link: ge.html_link,
            start,
            status: EventStatus::from_api(ge.status.as_deref()),
            color: None,
            reminders: vec![],
        })
    }
}

fn parse_start(start: &GoogleDateTime) -> Result<EventStart, ApiError> {
    if let Some(date_time) = &start.date_time {
        return DateTime::parse_from_rfc3339(date_time)
            .map(EventStart::DateTime)
            .map_err(|e| ApiError::ParseError(format!("Invalid start time '{}': {}", date_time, e)));
    }

    if let Some(date) = &start.date {
        return NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(EventStart::Date)
            .map_err(|e| ApiError::ParseError(format!("Invalid start date '{}': {}", date, e)));
    }

    Err(ApiError::ParseError("Missing start".to_string()))
}

fn convert_reminder(reminder: GoogleReminder) -> ReminderRule {
    ReminderRule {
        method: ReminderMethod::from_api(reminder.method.as_deref().unwrap_or_default()),
        minutes_before: reminder.minutes.unwrap_or(0),
    }
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_calendars(&self) -> Result<Vec<CalendarSource>, ApiError> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = Vec::new();
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: CalendarListResponse = self.get_json(&url, &query, "calendar list").await?;

            calendars.extend(page.items.unwrap_or_default().into_iter().map(|item| CalendarSource {
                summary: item.summary.unwrap_or_else(|| item.id.clone()),
                id: item.id,
                selected: item.selected,
                color_id: item.color_id,
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!("Fetched {} calendars", calendars.len());
        Ok(calendars)
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        window: &QueryWindow,
        max_results: u32,
    ) -> Result<EventPage, ApiError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        tracing::info!("Fetching events for {} from {} to {}", calendar_id, window.start, window.end);

        let query = [
            ("timeMin", rfc3339(window.start)),
            ("timeMax", rfc3339(window.end)),
            ("maxResults", max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];

        let event_list: EventListResponse = self.get_json(&url, &query, calendar_id).await?;

        let events: Vec<CalendarEvent> = event_list.items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|ge| match Self::convert_from_google_event(ge, calendar_id) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Skipping event in {}: {}", calendar_id, e);
                    None
                }
            })
            .collect();

        let default_reminders = event_list.default_reminders
            .unwrap_or_default()
            .into_iter()
            .map(convert_reminder)
            .collect();

        tracing::info!("Fetched {} events from {}", events.len(), calendar_id);
        Ok(EventPage { events, default_reminders })
    }

    async fn fetch_colors(&self) -> Result<ColorPalette, ApiError> {
        let url = format!("{}/colors", self.base_url);
        let colors: ColorsResponse = self.get_json(&url, &[], "color palette").await?;
        Ok(ColorPalette::new(colors.calendar.unwrap_or_default()))
    }
}
