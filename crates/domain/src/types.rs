//! Domain data types for the activity cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{EnrichErrorKind, FetchError, TermicalError};

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SyncWindow {
    /// Create a window; `end` must be strictly after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TermicalError> {
        if end <= start {
            return Err(TermicalError::InvalidInput(format!(
                "window end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `ts` falls inside the window (start inclusive, end exclusive).
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Whether two half-open windows share any instant.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Raw calendar event as reported by the upstream source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<String>,
}

/// A single extracted action item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    /// What needs to be done
    pub text: String,
    /// Who is responsible, when stated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// Enrichment output for one activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub summary: String,
    pub action_items: Vec<ActionItem>,
}

/// Enrichment lifecycle of a cached activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Not yet enriched for the current fingerprint
    Pending,
    /// Summary and action items present for the current fingerprint
    Done,
    /// Enrichment exhausted its attempts; retried only after content changes
    Failed { attempts: u32, last_error: EnrichErrorKind },
}

impl EnrichmentStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Attempts consumed so far; zero unless failed.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Failed { attempts, .. } => *attempts,
            _ => 0,
        }
    }
}

/// The unit of record: one calendar event plus its enrichment state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<String>,
    pub content_fingerprint: String,
    pub ai_summary: Option<String>,
    pub action_items: Vec<ActionItem>,
    pub enrichment_status: EnrichmentStatus,
    pub last_synced: DateTime<Utc>,
}

impl Activity {
    /// Build a fresh cache record from an upstream event.
    ///
    /// Attendees are de-duplicated (first occurrence wins) and the content
    /// fingerprint is computed over the normalized fields.
    pub fn from_raw(raw: &RawEvent, now: DateTime<Utc>) -> Self {
        let attendees = dedup_preserving_order(&raw.attendees);
        let content_fingerprint = content_fingerprint(
            &raw.title,
            raw.description.as_deref(),
            &attendees,
            raw.start_time,
            raw.end_time,
        );

        Self {
            event_id: raw.event_id.clone(),
            title: raw.title.clone(),
            description: raw.description.clone(),
            start_time: raw.start_time,
            end_time: raw.end_time,
            attendees,
            content_fingerprint,
            ai_summary: None,
            action_items: Vec::new(),
            enrichment_status: EnrichmentStatus::Pending,
            last_synced: now,
        }
    }

    /// Text shown by the read path when no summary is available.
    pub fn display_summary(&self) -> Option<&str> {
        self.ai_summary.as_deref().or(self.description.as_deref())
    }
}

/// Per-window reconciliation delta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl ReconcileResult {
    /// True when the run changed nothing (the idempotence signal).
    pub fn is_empty_delta(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// Outcome counters for one enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_stale_fingerprint: usize,
}

/// Result of `ensure_fresh` for a window
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Cache was fresh; no network calls issued
    Fresh,
    /// Upstream fetched and reconciled
    Synced(ReconcileResult),
    /// Upstream unreachable; cached data served as-is
    StaleFallback(FetchError),
}

/// Hex SHA-256 over the content fields, used to detect upstream edits
/// without a full field comparison.
///
/// Fields are length-prefixed so adjacent values cannot collide
/// (e.g. `"ab" + "c"` vs `"a" + "bc"`). Attendees are hashed in sorted
/// order: reordering is not a content change.
pub fn content_fingerprint(
    title: &str,
    description: Option<&str>,
    attendees: &[String],
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();

    let mut feed = |part: &str| {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    };

    feed(title);
    feed(description.unwrap_or(""));
    let mut sorted: Vec<&str> = attendees.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    for attendee in sorted {
        feed(attendee);
    }
    feed(&start_time.timestamp_micros().to_string());
    feed(&end_time.timestamp_micros().to_string());

    hex::encode(hasher.finalize())
}

fn dedup_preserving_order(attendees: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    attendees.iter().filter(|a| seen.insert(a.as_str())).cloned().collect()
}
