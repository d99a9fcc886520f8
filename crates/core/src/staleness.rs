//! Staleness policy
//!
//! Pure decision logic; never touches the network or the store.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Whether a window needs a refresh.
///
/// Stale when no sync was ever recorded for the window, or when the last
/// recorded sync is older than `freshness_ttl`. A window synced with zero
/// events is fresh; "empty" is a cacheable fact distinct from "never
/// attempted."
pub fn is_stale(
    now: DateTime<Utc>,
    last_synced: Option<DateTime<Utc>>,
    freshness_ttl: Duration,
) -> bool {
    let Some(last_synced) = last_synced else {
        return true;
    };

    match (now - last_synced).to_std() {
        Ok(age) => age > freshness_ttl,
        // last_synced ahead of the clock; treat as fresh
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const TTL: Duration = Duration::from_secs(30 * 60);

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn never_synced_is_stale() {
        assert!(is_stale(ts(1_000_000), None, TTL));
    }

    #[test]
    fn fresh_immediately_after_sync() {
        assert!(!is_stale(ts(1_000_000), Some(ts(1_000_000)), TTL));
    }

    #[test]
    fn fresh_within_ttl() {
        assert!(!is_stale(ts(1_000_000 + 29 * 60), Some(ts(1_000_000)), TTL));
        // boundary: exactly ttl old is still fresh
        assert!(!is_stale(ts(1_000_000 + 30 * 60), Some(ts(1_000_000)), TTL));
    }

    #[test]
    fn stale_once_ttl_exceeded() {
        assert!(is_stale(ts(1_000_000 + 30 * 60 + 1), Some(ts(1_000_000)), TTL));
    }

    #[test]
    fn future_sync_time_is_fresh() {
        assert!(!is_stale(ts(1_000_000), Some(ts(1_000_500)), TTL));
    }
}
