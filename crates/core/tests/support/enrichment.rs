use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use termical_core::EnrichmentService;
use termical_domain::{EnrichError, Enrichment};

/// Scripted fake for `EnrichmentService`.
///
/// Succeeds with a derived summary by default; individual titles can be
/// scripted to fail or to return a canned enrichment. An optional delay
/// keeps calls in flight long enough to exercise concurrency behaviour.
#[derive(Default)]
pub struct ScriptedEnrichmentService {
    responses: Mutex<HashMap<String, Enrichment>>,
    failures: Mutex<HashMap<String, EnrichError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    calls_by_title: Mutex<HashMap<String, usize>>,
}

impl ScriptedEnrichmentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a canned enrichment for a title.
    pub fn respond_with(self, title: &str, enrichment: Enrichment) -> Self {
        self.responses.lock().unwrap().insert(title.to_string(), enrichment);
        self
    }

    /// Script a failure for a title.
    pub fn fail_for(self, title: &str, err: EnrichError) -> Self {
        self.failures.lock().unwrap().insert(title.to_string(), err);
        self
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total calls across all titles.
    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls issued for one title.
    pub fn calls_for(&self, title: &str) -> usize {
        self.calls_by_title.lock().unwrap().get(title).copied().unwrap_or(0)
    }
}

#[async_trait]
impl EnrichmentService for ScriptedEnrichmentService {
    async fn enrich(
        &self,
        title: &str,
        _description: Option<&str>,
    ) -> Result<Enrichment, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_title.lock().unwrap().entry(title.to_string()).or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failures.lock().unwrap().get(title) {
            return Err(err.clone());
        }

        if let Some(enrichment) = self.responses.lock().unwrap().get(title) {
            return Ok(enrichment.clone());
        }

        Ok(Enrichment { summary: format!("Summary of {title}"), action_items: vec![] })
    }
}
