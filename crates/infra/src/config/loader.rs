//! Configuration loader
//!
//! Reads engine settings from a TOML file (the CLI layer decides where that
//! file lives, typically `~/.termical/config.toml`). A missing file yields
//! the defaults; a present-but-invalid file is an error.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use termical_domain::{EngineConfig, Result, TermicalError};
use tracing::{debug, info};

/// File-level settings, all optional.
#[derive(Debug, Default, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    sync: SyncSection,
    #[serde(default)]
    enrichment: EnrichmentSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SyncSection {
    freshness_ttl_minutes: u64,
    calendar_fetch_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EnrichmentSection {
    concurrency_limit: usize,
    max_attempts: u32,
    call_timeout_secs: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self { freshness_ttl_minutes: 30, calendar_fetch_timeout_secs: 30 }
    }
}

impl Default for EnrichmentSection {
    fn default() -> Self {
        Self { concurrency_limit: 4, max_attempts: 3, call_timeout_secs: 20 }
    }
}

impl From<SyncSettings> for EngineConfig {
    fn from(settings: SyncSettings) -> Self {
        Self {
            freshness_ttl: Duration::from_secs(settings.sync.freshness_ttl_minutes * 60),
            enrichment_concurrency_limit: settings.enrichment.concurrency_limit,
            max_enrichment_attempts: settings.enrichment.max_attempts,
            calendar_fetch_timeout: Duration::from_secs(
                settings.sync.calendar_fetch_timeout_secs,
            ),
            enrichment_call_timeout: Duration::from_secs(settings.enrichment.call_timeout_secs),
        }
    }
}

/// Load a validated [`EngineConfig`] from `path`.
///
/// # Errors
/// Returns `TermicalError::Config` when the file exists but cannot be read
/// or parsed, or when the resulting configuration is invalid.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let settings = if path.exists() {
        info!(path = %path.display(), "loading configuration from file");
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TermicalError::Config(format!("failed to read config file: {e}")))?;
        toml::from_str::<SyncSettings>(&contents)
            .map_err(|e| TermicalError::Config(format!("invalid TOML format: {e}")))?
    } else {
        debug!(path = %path.display(), "no config file; using defaults");
        SyncSettings::default()
    };

    let config = EngineConfig::from(settings);
    config.validate()?;
    Ok(config)
}
