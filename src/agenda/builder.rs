use std::convert::Infallible;

use chrono::NaiveDate;

use crate::agenda::AgendaSnapshot;
use crate::calendar::CalendarEvent;

/// Returned by walk callbacks to keep going or end the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Walks `snapshot` once, calling `on_date_boundary` whenever the calendar
/// day changes (including before the first event) and `on_event` for each
/// event. A `Stop` from either callback ends the walk immediately.
pub fn walk<D, E>(snapshot: &AgendaSnapshot, mut on_date_boundary: D, mut on_event: E)
where
    D: FnMut(NaiveDate) -> Flow,
    E: FnMut(&CalendarEvent) -> Flow,
{
    let result: Result<(), Infallible> = try_walk(
        snapshot,
        |day| Ok(on_date_boundary(day)),
        |event| Ok(on_event(event)),
    );
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Fallible form of [`walk`]. The first callback error ends the walk and is
/// returned to the caller as-is.
pub fn try_walk<D, E, Err>(
    snapshot: &AgendaSnapshot,
    mut on_date_boundary: D,
    mut on_event: E,
) -> Result<(), Err>
where
    D: FnMut(NaiveDate) -> Result<Flow, Err>,
    E: FnMut(&CalendarEvent) -> Result<Flow, Err>,
{
    let mut current_day: Option<NaiveDate> = None;

    for event in snapshot {
        let day = event.calendar_day();
        if current_day != Some(day) {
            current_day = Some(day);
            if on_date_boundary(day)? == Flow::Stop {
                tracing::debug!("Date boundary handler stopped the walk at {}", day);
                return Ok(());
            }
        }

        if on_event(event)? == Flow::Stop {
            tracing::debug!("Event handler stopped the walk at {}", event.id);
            return Ok(());
        }
    }

    Ok(())
}
