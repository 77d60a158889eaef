pub mod event;
pub mod calendar_type;

pub use event::{CalendarEvent, EventStart, EventStatus, ReminderMethod, ReminderRule, DEFAULT_TITLE};
pub use calendar_type::{CalendarSource, ColorDefinition, ColorPalette};
