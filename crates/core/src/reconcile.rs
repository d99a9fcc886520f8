//! Window reconciliation
//!
//! Merges a fetched event set into the cache, preserving enrichment on
//! records whose content did not change.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use termical_domain::{Activity, RawEvent, ReconcileResult, Result, SyncWindow};
use tracing::{debug, info, instrument};

use crate::ports::ActivityStore;

/// Merges fetched upstream state into the activity cache.
///
/// The fetched set is treated as the complete authoritative set for the
/// window: cached records absent upstream are deleted. Running twice with
/// the same input yields the same end state and an empty second delta.
pub struct Reconciler {
    store: Arc<dyn ActivityStore>,
}

impl Reconciler {
    /// Create a new reconciler over the given store.
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    /// Reconcile `fetched` into the cache for `window`.
    ///
    /// Per-record writes happen first; the window sync time is committed
    /// last, so a crash mid-window leaves the window "not yet synced" and
    /// the next run reconciles it from scratch. Storage errors abort the
    /// run before the sync time is written.
    #[instrument(skip(self, fetched), fields(%window, fetched = fetched.len()))]
    pub async fn reconcile(
        &self,
        window: SyncWindow,
        fetched: Vec<RawEvent>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileResult> {
        let cached = self.store.list_in_window(window).await?;
        let mut by_id: HashMap<String, Activity> =
            cached.iter().map(|a| (a.event_id.clone(), a.clone())).collect();

        let mut result = ReconcileResult::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(fetched.len());

        for raw in &fetched {
            let incoming = Activity::from_raw(raw, now);
            seen.insert(raw.event_id.clone());

            // Events starting outside the window are still upserted; they
            // only never become deletion candidates here.
            let existing = match by_id.get(&raw.event_id) {
                Some(activity) => Some(activity.clone()),
                None => self.store.get(&raw.event_id).await?,
            };

            match existing {
                None => {
                    self.store.upsert(&incoming).await?;
                    debug!(event_id = %incoming.event_id, "created activity");
                    by_id.insert(incoming.event_id.clone(), incoming);
                    result.created += 1;
                }
                Some(current)
                    if current.content_fingerprint == incoming.content_fingerprint =>
                {
                    // Content unchanged: keep enrichment, refresh last_synced.
                    let mut refreshed = current;
                    refreshed.last_synced = now.max(refreshed.last_synced);
                    self.store.upsert(&refreshed).await?;
                    by_id.insert(refreshed.event_id.clone(), refreshed);
                    result.unchanged += 1;
                }
                Some(current) => {
                    // Content changed upstream: overwrite and re-queue
                    // enrichment. Never keep a summary for stale content.
                    debug!(event_id = %current.event_id, "activity content changed; enrichment reset");
                    self.store.upsert(&incoming).await?;
                    by_id.insert(incoming.event_id.clone(), incoming);
                    result.updated += 1;
                }
            }
        }

        // Closed-world within the window: anything cached but not fetched
        // no longer exists upstream.
        for activity in &cached {
            if !seen.contains(&activity.event_id) {
                self.store.delete(&activity.event_id).await?;
                debug!(event_id = %activity.event_id, "deleted activity absent upstream");
                result.deleted += 1;
            }
        }

        self.store.set_window_sync_time(window, now).await?;

        info!(
            created = result.created,
            updated = result.updated,
            unchanged = result.unchanged,
            deleted = result.deleted,
            "reconciled window"
        );

        Ok(result)
    }
}
