//! Google Calendar integration
//!
//! Implements the `CalendarSource` port against the Calendar v3 events API.
//! OAuth token acquisition is the caller's concern; this client only needs a
//! bearer token.

mod client;
mod types;

pub use client::GoogleCalendarClient;
