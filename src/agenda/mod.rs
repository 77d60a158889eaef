pub mod snapshot;
pub mod builder;
pub mod reminders;
pub mod presentation;

pub use snapshot::AgendaSnapshot;
pub use builder::{walk, try_walk, Flow};
pub use reminders::{next_due, scan, scan_between, truncate_to_minute};
pub use presentation::{build_entries, AgendaEntry, ClockFace, EventEntry, EventLink, PresentationOptions};
