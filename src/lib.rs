pub mod calendar;
pub mod agenda;
pub mod sync;
pub mod storage;
pub mod app;

pub use calendar::{CalendarEvent, EventStart, EventStatus};
pub use agenda::{AgendaEntry, AgendaSnapshot, Flow};
pub use app::{AgendaApp, TickOutcome};
