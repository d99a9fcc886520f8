//! Sync orchestration
//!
//! Top-level entry point composing the staleness policy, the reconciler and
//! the enrichment scheduler. The read path queries the store directly once
//! freshness is confirmed.

use std::sync::Arc;

use chrono::Utc;
use termical_domain::{
    Activity, EngineConfig, FetchError, Result, SyncOutcome, SyncWindow,
};
use tracing::{debug, info, instrument, warn};

use crate::enrich::EnrichmentScheduler;
use crate::ports::{ActivityStore, CalendarSource, EnrichmentService};
use crate::reconcile::Reconciler;
use crate::staleness::is_stale;

/// Orchestrates synchronization for the read path.
///
/// All collaborators are injected; construction fails on an invalid
/// configuration.
pub struct SyncEngine {
    calendar: Arc<dyn CalendarSource>,
    store: Arc<dyn ActivityStore>,
    reconciler: Reconciler,
    scheduler: EnrichmentScheduler,
    config: EngineConfig,
}

impl SyncEngine {
    /// Create a new sync engine.
    pub fn new(
        calendar: Arc<dyn CalendarSource>,
        enrichment: Arc<dyn EnrichmentService>,
        store: Arc<dyn ActivityStore>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            calendar,
            reconciler: Reconciler::new(Arc::clone(&store)),
            scheduler: EnrichmentScheduler::new(enrichment, Arc::clone(&store), &config),
            store,
            config,
        })
    }

    /// Make `window` fresh, syncing upstream only when needed.
    ///
    /// A fresh window returns immediately with no network calls. A fetch
    /// failure (including timeout) degrades to `StaleFallback` with the
    /// cache intact; only storage failures surface as errors.
    #[instrument(skip(self), fields(%window))]
    pub async fn ensure_fresh(&self, window: SyncWindow) -> Result<SyncOutcome> {
        let last_synced = self.store.window_sync_time(window).await?;

        if !is_stale(Utc::now(), last_synced, self.config.freshness_ttl) {
            debug!("window is fresh; skipping sync");
            return Ok(SyncOutcome::Fresh);
        }

        self.refresh(window).await
    }

    /// Sync `window` unconditionally, bypassing the staleness check.
    #[instrument(skip(self), fields(%window))]
    pub async fn force_refresh(&self, window: SyncWindow) -> Result<SyncOutcome> {
        self.refresh(window).await
    }

    /// The warm read path: cached activities for `window`, deterministic
    /// order, no network.
    pub async fn activities(&self, window: SyncWindow) -> Result<Vec<Activity>> {
        self.store.list_in_window(window).await
    }

    async fn refresh(&self, window: SyncWindow) -> Result<SyncOutcome> {
        let fetch = self.calendar.fetch_events(window);
        let fetched = match tokio::time::timeout(self.config.calendar_fetch_timeout, fetch).await {
            Ok(Ok(events)) => events,
            Ok(Err(err)) => {
                warn!(error = %err, "calendar fetch failed; serving cached data");
                return Ok(SyncOutcome::StaleFallback(err));
            }
            Err(_) => {
                let err = FetchError::Network(format!(
                    "calendar fetch timed out after {:?}",
                    self.config.calendar_fetch_timeout
                ));
                warn!(error = %err, "calendar fetch timed out; serving cached data");
                return Ok(SyncOutcome::StaleFallback(err));
            }
        };

        info!(fetched = fetched.len(), "fetched events from calendar source");

        let delta = self.reconciler.reconcile(window, fetched, Utc::now()).await?;

        // Enrichment is best-effort and never fails the sync; the read path
        // re-reads the store and renders pending activities without a
        // summary. Storage errors inside the pass are logged, not raised:
        // the reconciled window is already served.
        match self.scheduler.enrich_pending(window).await {
            Ok(report) => debug!(
                succeeded = report.succeeded,
                failed = report.failed,
                skipped_stale_fingerprint = report.skipped_stale_fingerprint,
                "enrichment report"
            ),
            Err(err) => warn!(error = %err, "enrichment pass aborted"),
        }

        Ok(SyncOutcome::Synced(delta))
    }
}
