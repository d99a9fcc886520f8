//! Wire types for the Google Calendar events API

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleEventsPage {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub attendees: Option<Vec<GoogleAttendee>>,
    pub status: Option<String>,
}

/// Either `dateTime` (timed event) or `date` (all-day event) is set.
#[derive(Debug, Deserialize)]
pub(crate) struct EventDateTime {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    #[allow(dead_code)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleAttendee {
    pub email: String,
}
