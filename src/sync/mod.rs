pub mod google_api;
pub mod google_auth;
pub mod agenda_sync;

pub use agenda_sync::AgendaSync;
pub use google_api::{ApiError, CalendarApi, EventPage, GoogleCalendarClient, QueryWindow};
pub use google_auth::{AuthError, CredentialProvider, GoogleAuthenticator, StaticToken};
