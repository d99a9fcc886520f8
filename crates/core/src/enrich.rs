//! Enrichment scheduling
//!
//! Drives concurrent, rate-limited enrichment calls for activities that
//! need them, with per-activity isolation and bounded retry.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use termical_domain::{
    Activity, EngineConfig, EnrichError, Enrichment, EnrichmentReport, EnrichmentStatus, Result,
    SyncWindow, TermicalError,
};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::ports::{ActivityStore, EnrichmentService};

const BASE_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 32_000;

enum TaskOutcome {
    Succeeded,
    Failed,
    SkippedStale,
}

/// Schedules enrichment calls for activities that are not yet `Done`.
///
/// Concurrency is bounded by a semaphore; a shared in-flight set guarantees
/// at most one upstream call per `event_id` at a time, even across
/// overlapping passes. Writers never hold a lock across a store access;
/// results are committed behind a fingerprint check instead.
pub struct EnrichmentScheduler {
    service: Arc<dyn EnrichmentService>,
    store: Arc<dyn ActivityStore>,
    limiter: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    call_timeout: Duration,
    max_attempts: u32,
}

impl EnrichmentScheduler {
    /// Create a new scheduler from the engine configuration.
    pub fn new(
        service: Arc<dyn EnrichmentService>,
        store: Arc<dyn ActivityStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            service,
            store,
            limiter: Arc::new(Semaphore::new(config.enrichment_concurrency_limit)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            call_timeout: config.enrichment_call_timeout,
            max_attempts: config.max_enrichment_attempts,
        }
    }

    /// Enrich every qualifying activity in `window`.
    ///
    /// Qualifying means `enrichment_status != Done` and attempts not yet
    /// exhausted. Failures are isolated per activity; only storage errors
    /// fail the pass as a whole.
    #[instrument(skip(self), fields(%window))]
    pub async fn enrich_pending(&self, window: SyncWindow) -> Result<EnrichmentReport> {
        let candidates: Vec<Activity> = self
            .store
            .list_in_window(window)
            .await?
            .into_iter()
            .filter(|a| needs_enrichment(a, self.max_attempts))
            .collect();

        if candidates.is_empty() {
            return Ok(EnrichmentReport::default());
        }

        debug!(count = candidates.len(), "dispatching enrichment calls");

        let mut tasks: JoinSet<Result<TaskOutcome>> = JoinSet::new();

        for activity in candidates {
            let event_id = activity.event_id.clone();
            if !self.in_flight.lock().await.insert(event_id.clone()) {
                debug!(%event_id, "enrichment already in flight; not dispatching a duplicate");
                continue;
            }

            let service = Arc::clone(&self.service);
            let store = Arc::clone(&self.store);
            let limiter = Arc::clone(&self.limiter);
            let in_flight = Arc::clone(&self.in_flight);
            let call_timeout = self.call_timeout;

            tasks.spawn(async move {
                let outcome = enrich_one(service, store, limiter, activity, call_timeout).await;
                in_flight.lock().await.remove(&event_id);
                outcome
            });
        }

        // Drain every task before surfacing an error so the in-flight set
        // is left clean even when storage fails mid-pass.
        let mut report = EnrichmentReport::default();
        let mut first_err: Option<TermicalError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(TaskOutcome::Succeeded)) => report.succeeded += 1,
                Ok(Ok(TaskOutcome::Failed)) => report.failed += 1,
                Ok(Ok(TaskOutcome::SkippedStale)) => report.skipped_stale_fingerprint += 1,
                Ok(Err(err)) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
                Err(join_err) => {
                    if first_err.is_none() {
                        first_err = Some(TermicalError::Internal(format!(
                            "enrichment task failed: {join_err}"
                        )));
                    }
                }
            }
        }

        if let Some(err) = first_err {
            return Err(err);
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped_stale_fingerprint = report.skipped_stale_fingerprint,
            "enrichment pass complete"
        );

        Ok(report)
    }
}

fn needs_enrichment(activity: &Activity, max_attempts: u32) -> bool {
    match activity.enrichment_status {
        EnrichmentStatus::Done => false,
        EnrichmentStatus::Pending => true,
        EnrichmentStatus::Failed { attempts, .. } => attempts < max_attempts,
    }
}

async fn enrich_one(
    service: Arc<dyn EnrichmentService>,
    store: Arc<dyn ActivityStore>,
    limiter: Arc<Semaphore>,
    activity: Activity,
    call_timeout: Duration,
) -> Result<TaskOutcome> {
    let prior_attempts = activity.enrichment_status.attempts();
    if prior_attempts > 0 {
        tokio::time::sleep(backoff_delay(&activity.event_id, prior_attempts)).await;
    }

    let permit = limiter
        .acquire_owned()
        .await
        .map_err(|_| TermicalError::Internal("enrichment limiter closed".into()))?;

    let call = service.enrich(&activity.title, activity.description.as_deref());
    let result = match tokio::time::timeout(call_timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(EnrichError::Timeout(call_timeout)),
    };
    drop(permit);

    match result {
        Ok(enrichment) => commit_success(store, &activity, enrichment).await,
        Err(err) => commit_failure(store, &activity, &err, prior_attempts).await,
    }
}

/// Write the enrichment result, guarded by a fingerprint check.
///
/// A record edited or deleted between dispatch and completion keeps its
/// reconciler-written state; the late result is discarded, not an error.
async fn commit_success(
    store: Arc<dyn ActivityStore>,
    dispatched: &Activity,
    enrichment: Enrichment,
) -> Result<TaskOutcome> {
    let Some(current) = store.get(&dispatched.event_id).await? else {
        debug!(event_id = %dispatched.event_id, "activity deleted mid-flight; result discarded");
        return Ok(TaskOutcome::SkippedStale);
    };

    if current.content_fingerprint != dispatched.content_fingerprint {
        debug!(event_id = %dispatched.event_id, "fingerprint changed mid-flight; result discarded");
        return Ok(TaskOutcome::SkippedStale);
    }

    let mut updated = current;
    updated.ai_summary = Some(enrichment.summary);
    updated.action_items = enrichment.action_items;
    updated.enrichment_status = EnrichmentStatus::Done;
    store.upsert(&updated).await?;

    debug!(event_id = %dispatched.event_id, "activity enriched");
    Ok(TaskOutcome::Succeeded)
}

async fn commit_failure(
    store: Arc<dyn ActivityStore>,
    dispatched: &Activity,
    err: &EnrichError,
    prior_attempts: u32,
) -> Result<TaskOutcome> {
    warn!(event_id = %dispatched.event_id, error = %err, "enrichment call failed");

    let Some(current) = store.get(&dispatched.event_id).await? else {
        return Ok(TaskOutcome::SkippedStale);
    };

    if current.content_fingerprint != dispatched.content_fingerprint {
        return Ok(TaskOutcome::SkippedStale);
    }

    let mut updated = current;
    updated.enrichment_status = EnrichmentStatus::Failed {
        attempts: prior_attempts + 1,
        last_error: err.kind(),
    };
    store.upsert(&updated).await?;

    Ok(TaskOutcome::Failed)
}

/// Exponential backoff before a retry attempt: doubling from one second,
/// capped at 32 seconds, with deterministic per-event jitter of up to
/// a quarter of the delay in either direction.
fn backoff_delay(event_id: &str, prior_attempts: u32) -> Duration {
    let exp = BASE_BACKOFF_MS.saturating_mul(1u64 << prior_attempts.min(5));
    let capped = exp.min(MAX_BACKOFF_MS);

    let mut hasher = DefaultHasher::new();
    (event_id, prior_attempts).hash(&mut hasher);
    let range = capped / 4;
    let offset = (hasher.finish() % (2 * range + 1)) as i64 - range as i64;

    Duration::from_millis(capped.saturating_add_signed(offset))
}
