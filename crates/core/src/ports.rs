//! Port interfaces consumed by the sync engine

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use termical_domain::{
    Activity, EnrichError, Enrichment, FetchError, RawEvent, Result, SyncWindow,
};

/// Trait for the upstream calendar provider.
///
/// The returned events are the complete authoritative set for the window;
/// callers must never pass a partial/paginated result to the reconciler.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Fetch all events whose occurrence falls inside `window`.
    async fn fetch_events(
        &self,
        window: SyncWindow,
    ) -> std::result::Result<Vec<RawEvent>, FetchError>;
}

/// Trait for the AI enrichment provider.
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    /// Produce a summary and action items for one activity's text.
    async fn enrich(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> std::result::Result<Enrichment, EnrichError>;
}

/// Trait for the durable activity cache.
///
/// Each operation is atomic at single-`event_id` granularity; no transaction
/// spans multiple records. Window-level atomicity is achieved by writing all
/// per-record changes first and the window sync time last.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Look up one activity by its upstream id.
    async fn get(&self, event_id: &str) -> Result<Option<Activity>>;

    /// Insert-or-replace by `event_id`.
    async fn upsert(&self, activity: &Activity) -> Result<()>;

    /// Remove an activity; removing an absent id is not an error.
    async fn delete(&self, event_id: &str) -> Result<()>;

    /// Activities whose `start_time` falls in `window`, ordered by
    /// `start_time` ascending, ties broken by `event_id` ascending.
    async fn list_in_window(&self, window: SyncWindow) -> Result<Vec<Activity>>;

    /// Most recent recorded sync time among windows overlapping `window`.
    async fn window_sync_time(&self, window: SyncWindow) -> Result<Option<DateTime<Utc>>>;

    /// Record a completed sync for `window`.
    async fn set_window_sync_time(
        &self,
        window: SyncWindow,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
}
