use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use termical_core::CalendarSource;
use termical_domain::{FetchError, RawEvent, SyncWindow};

/// Scripted fake for `CalendarSource`.
///
/// Returns its queued responses in order; an unexpected extra fetch
/// surfaces as a network error so over-fetching fails tests loudly.
#[derive(Default)]
pub struct ScriptedCalendarSource {
    responses: Mutex<VecDeque<Result<Vec<RawEvent>, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedCalendarSource {
    /// Create a source that will answer with the given responses in order.
    pub fn new(responses: Vec<Result<Vec<RawEvent>, FetchError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), calls: AtomicUsize::new(0) }
    }

    /// Convenience constructor for a single successful fetch.
    pub fn returning(events: Vec<RawEvent>) -> Self {
        Self::new(vec![Ok(events)])
    }

    /// Convenience constructor for a source that always fails.
    pub fn failing(err: FetchError) -> Self {
        Self::new(vec![Err(err)])
    }

    /// Number of fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarSource for ScriptedCalendarSource {
    async fn fetch_events(&self, _window: SyncWindow) -> Result<Vec<RawEvent>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("no scripted response left".to_string())))
    }
}
