//! Shared test helpers for `termical-core` integration tests.
//!
//! Scripted fakes for the calendar and enrichment ports, plus fixture
//! builders, so the engine tests focus on behaviour instead of boilerplate.

pub mod calendar;
pub mod enrichment;

use chrono::{DateTime, TimeZone, Utc};
use termical_domain::{RawEvent, SyncWindow};

/// Timestamp helper: seconds since the epoch.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Window helper; panics on inverted bounds (test input error).
pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> SyncWindow {
    SyncWindow::new(start, end).unwrap()
}

/// Build a raw upstream event with the given identity and times.
pub fn raw_event(
    event_id: &str,
    title: &str,
    description: Option<&str>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> RawEvent {
    RawEvent {
        event_id: event_id.to_string(),
        title: title.to_string(),
        description: description.map(str::to_string),
        start_time: start,
        end_time: end,
        attendees: vec![],
    }
}
