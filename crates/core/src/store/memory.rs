//! In-memory reference implementation of the `ActivityStore` port.
//!
//! Backs unit and integration tests, and serves as a real store for callers
//! that do not need durability. The SQLite-backed store in `termical-infra`
//! is the durable counterpart.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use termical_domain::{Activity, Result, SyncWindow};

use crate::ports::ActivityStore;

/// In-memory `ActivityStore` keyed by `event_id`.
#[derive(Default)]
pub struct InMemoryActivityStore {
    activities: Mutex<BTreeMap<String, Activity>>,
    window_syncs: Mutex<HashMap<SyncWindow, DateTime<Utc>>>,
}

impl InMemoryActivityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the provided activities.
    pub fn with_activities(activities: Vec<Activity>) -> Self {
        let store = Self::new();
        {
            let mut map = lock(&store.activities);
            for activity in activities {
                map.insert(activity.event_id.clone(), activity);
            }
        }
        store
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        lock(&self.activities).len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        lock(&self.activities).is_empty()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn get(&self, event_id: &str) -> Result<Option<Activity>> {
        Ok(lock(&self.activities).get(event_id).cloned())
    }

    async fn upsert(&self, activity: &Activity) -> Result<()> {
        lock(&self.activities).insert(activity.event_id.clone(), activity.clone());
        Ok(())
    }

    async fn delete(&self, event_id: &str) -> Result<()> {
        lock(&self.activities).remove(event_id);
        Ok(())
    }

    async fn list_in_window(&self, window: SyncWindow) -> Result<Vec<Activity>> {
        let mut matching: Vec<Activity> = lock(&self.activities)
            .values()
            .filter(|a| window.contains(a.start_time))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.start_time.cmp(&b.start_time).then_with(|| a.event_id.cmp(&b.event_id))
        });
        Ok(matching)
    }

    async fn window_sync_time(&self, window: SyncWindow) -> Result<Option<DateTime<Utc>>> {
        Ok(lock(&self.window_syncs)
            .iter()
            .filter(|(recorded, _)| recorded.overlaps(&window))
            .map(|(_, ts)| *ts)
            .max())
    }

    async fn set_window_sync_time(
        &self,
        window: SyncWindow,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        lock(&self.window_syncs).insert(window, timestamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use termical_domain::RawEvent;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn activity(event_id: &str, start: i64) -> Activity {
        Activity::from_raw(
            &RawEvent {
                event_id: event_id.to_string(),
                title: format!("Event {event_id}"),
                description: None,
                start_time: ts(start),
                end_time: ts(start + 1_800),
                attendees: vec![],
            },
            ts(0),
        )
    }

    #[tokio::test]
    async fn upsert_replaces_by_event_id() {
        let store = InMemoryActivityStore::new();
        store.upsert(&activity("e1", 100)).await.unwrap();

        let mut replacement = activity("e1", 100);
        replacement.title = "Renamed".to_string();
        store.upsert(&replacement).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("e1").await.unwrap().unwrap().title, "Renamed");
    }

    #[tokio::test]
    async fn list_orders_by_start_then_event_id() {
        let store = InMemoryActivityStore::new();
        store.upsert(&activity("b", 200)).await.unwrap();
        store.upsert(&activity("a", 200)).await.unwrap();
        store.upsert(&activity("c", 100)).await.unwrap();

        let window = SyncWindow::new(ts(0), ts(10_000)).unwrap();
        let listed = store.list_in_window(window).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|a| a.event_id.as_str()).collect();

        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn list_excludes_start_at_window_end() {
        let store = InMemoryActivityStore::new();
        store.upsert(&activity("inside", 100)).await.unwrap();
        store.upsert(&activity("boundary", 1_000)).await.unwrap();

        let window = SyncWindow::new(ts(0), ts(1_000)).unwrap();
        let listed = store.list_in_window(window).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].event_id, "inside");
    }

    #[tokio::test]
    async fn window_sync_time_considers_overlapping_windows() {
        let store = InMemoryActivityStore::new();
        let morning = SyncWindow::new(ts(0), ts(3_600)).unwrap();
        let day = SyncWindow::new(ts(0), ts(86_400)).unwrap();
        let evening = SyncWindow::new(ts(72_000), ts(86_400)).unwrap();

        store.set_window_sync_time(day, ts(500)).await.unwrap();

        assert_eq!(store.window_sync_time(morning).await.unwrap(), Some(ts(500)));
        assert_eq!(store.window_sync_time(evening).await.unwrap(), Some(ts(500)));

        // a later overlapping sync wins
        store.set_window_sync_time(morning, ts(900)).await.unwrap();
        assert_eq!(store.window_sync_time(day).await.unwrap(), Some(ts(900)));

        let tomorrow = SyncWindow::new(ts(86_400), ts(172_800)).unwrap();
        assert_eq!(store.window_sync_time(tomorrow).await.unwrap(), None);
    }
}
