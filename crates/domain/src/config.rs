//! Engine configuration

use std::time::Duration;

use crate::errors::TermicalError;

/// Tunables consumed by the sync engine.
///
/// Supplied by the caller at construction; the engine never reads ambient
/// state. Invalid values fail construction via [`EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a synced window stays fresh
    pub freshness_ttl: Duration,
    /// Maximum simultaneous enrichment calls
    pub enrichment_concurrency_limit: usize,
    /// Total attempts per activity before it is left failed
    pub max_enrichment_attempts: u32,
    /// Timeout for one calendar fetch
    pub calendar_fetch_timeout: Duration,
    /// Timeout for one enrichment call
    pub enrichment_call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            freshness_ttl: Duration::from_secs(30 * 60),
            enrichment_concurrency_limit: 4,
            max_enrichment_attempts: 3,
            calendar_fetch_timeout: Duration::from_secs(30),
            enrichment_call_timeout: Duration::from_secs(20),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TermicalError> {
        if self.freshness_ttl.is_zero() {
            return Err(TermicalError::Config("freshness_ttl must be greater than zero".into()));
        }
        if self.enrichment_concurrency_limit == 0 {
            return Err(TermicalError::Config(
                "enrichment_concurrency_limit must be greater than zero".into(),
            ));
        }
        if self.max_enrichment_attempts == 0 {
            return Err(TermicalError::Config(
                "max_enrichment_attempts must be greater than zero".into(),
            ));
        }
        if self.calendar_fetch_timeout.is_zero() {
            return Err(TermicalError::Config(
                "calendar_fetch_timeout must be greater than zero".into(),
            ));
        }
        if self.enrichment_call_timeout.is_zero() {
            return Err(TermicalError::Config(
                "enrichment_call_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
