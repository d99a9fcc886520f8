//! Google Calendar client implementing the `CalendarSource` port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use termical_core::CalendarSource;
use termical_domain::{FetchError, RawEvent, SyncWindow};
use tracing::{debug, instrument, warn};

use super::types::{GoogleEvent, GoogleEventsPage};

const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: u32 = 250;
const DEFAULT_RATE_LIMIT_RETRY_SECS: u64 = 60;

/// Google Calendar API client.
///
/// Fetches every page for the requested window before returning, so the
/// reconciler always sees the complete event set. All-day events carry no
/// concrete start/end instant and are skipped.
pub struct GoogleCalendarClient {
    client: Client,
    access_token: String,
    calendar_id: String,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Create a client for the primary calendar with the given bearer token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.into(),
            calendar_id: "primary".to_string(),
            api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
        }
    }

    /// Target a specific calendar instead of `primary`.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    /// Point the client at a custom API base (for testing).
    #[cfg(test)]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    async fn fetch_page(
        &self,
        window: SyncWindow,
        page_token: Option<&str>,
    ) -> Result<GoogleEventsPage, FetchError> {
        let url = format!("{}/calendars/{}/events", self.api_base, self.calendar_id);

        let mut query: Vec<(&str, String)> = vec![
            ("timeMin", window.start().to_rfc3339()),
            ("timeMax", window.end().to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("timeZone", "UTC".to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Network(format!("calendar request timed out: {e}"))
                } else {
                    FetchError::Network(format!("calendar request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        response
            .json::<GoogleEventsPage>()
            .await
            .map_err(|e| FetchError::Network(format!("failed to parse calendar response: {e}")))
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    #[instrument(skip(self), fields(%window, calendar_id = %self.calendar_id))]
    async fn fetch_events(&self, window: SyncWindow) -> Result<Vec<RawEvent>, FetchError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(window, page_token.as_deref()).await?;

            for item in page.items {
                if let Some(event) = convert_event(item)? {
                    events.push(event);
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!(count = events.len(), "fetched calendar events");
        Ok(events)
    }
}

/// Convert one API item; `None` for events without a concrete time range
/// (all-day and cancelled events).
fn convert_event(item: GoogleEvent) -> Result<Option<RawEvent>, FetchError> {
    if item.status.as_deref() == Some("cancelled") {
        return Ok(None);
    }

    let (Some(start_str), Some(end_str)) = (&item.start.date_time, &item.end.date_time) else {
        debug!(event_id = %item.id, "skipping event without concrete start/end");
        return Ok(None);
    };

    let start_time = parse_event_time(start_str, &item.id)?;
    let end_time = parse_event_time(end_str, &item.id)?;

    let title = item
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Untitled Event".to_string());

    let attendees = item
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email.trim().to_string();
            if email.is_empty() {
                warn!(event_id = %item.id, "empty attendee email");
                None
            } else {
                Some(email)
            }
        })
        .collect();

    Ok(Some(RawEvent {
        event_id: item.id,
        title,
        description: item.description,
        start_time,
        end_time,
        attendees,
    }))
}

/// A malformed timestamp fails the whole fetch: serving a partial event set
/// to the reconciler would delete valid cached records.
fn parse_event_time(value: &str, event_id: &str) -> Result<DateTime<Utc>, FetchError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)).map_err(|e| {
        FetchError::Network(format!("invalid timestamp '{value}' on event {event_id}: {e}"))
    })
}

async fn error_for_status(response: Response) -> FetchError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    match status.as_u16() {
        401 | 403 => FetchError::Auth(format!("credentials rejected ({status}): {body}")),
        429 => FetchError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_RETRY_SECS),
        },
        _ => FetchError::Network(format!("calendar API error ({status}): {body}")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_window() -> SyncWindow {
        SyncWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn test_client(server: &MockServer) -> GoogleCalendarClient {
        GoogleCalendarClient::new("test-token").with_api_base(server.uri())
    }

    #[tokio::test]
    async fn fetches_and_converts_events() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {
                        "id": "e1",
                        "summary": "Standup",
                        "description": "Daily sync",
                        "start": { "dateTime": "2024-01-01T09:00:00Z" },
                        "end": { "dateTime": "2024-01-01T09:30:00Z" },
                        "attendees": [
                            { "email": "a@example.com" },
                            { "email": "b@example.com" }
                        ]
                    },
                    {
                        "id": "allday",
                        "summary": "Holiday",
                        "start": { "date": "2024-01-01" },
                        "end": { "date": "2024-01-02" }
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let events = client.fetch_events(test_window()).await.expect("should fetch");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "e1");
        assert_eq!(events[0].title, "Standup");
        assert_eq!(events[0].attendees, vec!["a@example.com", "b@example.com"]);
        assert_eq!(
            events[0].start_time,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn follows_pagination_to_completion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "id": "e1",
                    "summary": "First",
                    "start": { "dateTime": "2024-01-01T09:00:00Z" },
                    "end": { "dateTime": "2024-01-01T09:30:00Z" }
                }],
                "nextPageToken": "page-2"
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "id": "e2",
                    "summary": "Second",
                    "start": { "dateTime": "2024-01-01T09:30:00Z" },
                    "end": { "dateTime": "2024-01-01T10:00:00Z" }
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let events = client.fetch_events(test_window()).await.expect("should fetch");

        let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2"]);
    }

    #[tokio::test]
    async fn maps_auth_failures() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let result = client.fetch_events(test_window()).await;

        assert!(matches!(result, Err(FetchError::Auth(_))));
    }

    #[tokio::test]
    async fn maps_rate_limits_with_retry_after() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "30")
                    .set_body_string("Rate limit exceeded"),
            )
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let result = client.fetch_events(test_window()).await;

        assert!(matches!(result, Err(FetchError::RateLimited { retry_after_secs: 30 })));
    }

    #[tokio::test]
    async fn malformed_timestamp_fails_the_fetch() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "id": "bad",
                    "summary": "Broken",
                    "start": { "dateTime": "not-a-timestamp" },
                    "end": { "dateTime": "2024-01-01T10:00:00Z" }
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let result = client.fetch_events(test_window()).await;

        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
