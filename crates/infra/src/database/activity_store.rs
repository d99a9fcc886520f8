//! SQLite-backed implementation of the ActivityStore port.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use termical_core::ActivityStore;
use termical_domain::{
    ActionItem, Activity, EnrichErrorKind, EnrichmentStatus, Result, SyncWindow, TermicalError,
};
use tracing::{debug, instrument};

use crate::errors::InfraError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS activities (
    event_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    start_us INTEGER NOT NULL,
    end_us INTEGER NOT NULL,
    attendees TEXT NOT NULL,
    content_fingerprint TEXT NOT NULL,
    ai_summary TEXT,
    action_items TEXT NOT NULL,
    enrichment_state TEXT NOT NULL,
    enrichment_attempts INTEGER NOT NULL DEFAULT 0,
    enrichment_last_error TEXT,
    last_synced_us INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activities_start_us ON activities(start_us);

CREATE TABLE IF NOT EXISTS sync_windows (
    start_us INTEGER NOT NULL,
    end_us INTEGER NOT NULL,
    synced_us INTEGER NOT NULL,
    PRIMARY KEY (start_us, end_us)
);
";

const ACTIVITY_COLUMNS: &str = "event_id, title, description, start_us, end_us, attendees,
        content_fingerprint, ai_summary, action_items,
        enrichment_state, enrichment_attempts, enrichment_last_error, last_synced_us";

/// SQLite implementation of the activity cache.
///
/// Timestamps are stored as microseconds since the epoch; attendees and
/// action items as JSON columns. The schema is applied on construction.
pub struct SqliteActivityStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteActivityStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn new(path: &Path, pool_size: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(InfraError::from)?;

        let store = Self { pool };
        store.conn()?.execute_batch(SCHEMA).map_err(InfraError::from)?;

        debug!(path = %path.display(), "activity store ready");
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }
}

#[async_trait]
impl ActivityStore for SqliteActivityStore {
    #[instrument(skip(self))]
    async fn get(&self, event_id: &str) -> Result<Option<Activity>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE event_id = ?1"),
                params![event_id],
                read_row,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(InfraError::from(other)),
            })?;

        row.map(ActivityRow::into_activity).transpose()
    }

    #[instrument(skip(self, activity), fields(event_id = %activity.event_id))]
    async fn upsert(&self, activity: &Activity) -> Result<()> {
        let conn = self.conn()?;

        let attendees = serde_json::to_string(&activity.attendees).map_err(InfraError::from)?;
        let action_items =
            serde_json::to_string(&activity.action_items).map_err(InfraError::from)?;
        let (state, attempts, last_error) = status_columns(&activity.enrichment_status);

        conn.execute(
            "INSERT INTO activities (
                event_id, title, description, start_us, end_us, attendees,
                content_fingerprint, ai_summary, action_items,
                enrichment_state, enrichment_attempts, enrichment_last_error, last_synced_us
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(event_id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                start_us = excluded.start_us,
                end_us = excluded.end_us,
                attendees = excluded.attendees,
                content_fingerprint = excluded.content_fingerprint,
                ai_summary = excluded.ai_summary,
                action_items = excluded.action_items,
                enrichment_state = excluded.enrichment_state,
                enrichment_attempts = excluded.enrichment_attempts,
                enrichment_last_error = excluded.enrichment_last_error,
                last_synced_us = excluded.last_synced_us",
            params![
                activity.event_id,
                activity.title,
                activity.description,
                activity.start_time.timestamp_micros(),
                activity.end_time.timestamp_micros(),
                attendees,
                activity.content_fingerprint,
                activity.ai_summary,
                action_items,
                state,
                i64::from(attempts),
                last_error,
                activity.last_synced.timestamp_micros(),
            ],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, event_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM activities WHERE event_id = ?1", params![event_id])
            .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self), fields(%window))]
    async fn list_in_window(&self, window: SyncWindow) -> Result<Vec<Activity>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities
                 WHERE start_us >= ?1 AND start_us < ?2
                 ORDER BY start_us ASC, event_id ASC"
            ))
            .map_err(InfraError::from)?;

        let rows: Vec<ActivityRow> = stmt
            .query_map(
                params![window.start().timestamp_micros(), window.end().timestamp_micros()],
                read_row,
            )
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<_>>()
            .map_err(InfraError::from)?;

        rows.into_iter().map(ActivityRow::into_activity).collect()
    }

    #[instrument(skip(self), fields(%window))]
    async fn window_sync_time(&self, window: SyncWindow) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;

        let max_us: Option<i64> = conn
            .query_row(
                "SELECT MAX(synced_us) FROM sync_windows
                 WHERE start_us < ?1 AND end_us > ?2",
                params![window.end().timestamp_micros(), window.start().timestamp_micros()],
                |row| row.get(0),
            )
            .map_err(InfraError::from)?;

        max_us.map(timestamp_from_micros).transpose()
    }

    #[instrument(skip(self), fields(%window))]
    async fn set_window_sync_time(
        &self,
        window: SyncWindow,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO sync_windows (start_us, end_us, synced_us) VALUES (?1, ?2, ?3)
             ON CONFLICT(start_us, end_us) DO UPDATE SET synced_us = excluded.synced_us",
            params![
                window.start().timestamp_micros(),
                window.end().timestamp_micros(),
                timestamp.timestamp_micros(),
            ],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }
}

struct ActivityRow {
    event_id: String,
    title: String,
    description: Option<String>,
    start_us: i64,
    end_us: i64,
    attendees: String,
    content_fingerprint: String,
    ai_summary: Option<String>,
    action_items: String,
    enrichment_state: String,
    enrichment_attempts: i64,
    enrichment_last_error: Option<String>,
    last_synced_us: i64,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        event_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_us: row.get(3)?,
        end_us: row.get(4)?,
        attendees: row.get(5)?,
        content_fingerprint: row.get(6)?,
        ai_summary: row.get(7)?,
        action_items: row.get(8)?,
        enrichment_state: row.get(9)?,
        enrichment_attempts: row.get(10)?,
        enrichment_last_error: row.get(11)?,
        last_synced_us: row.get(12)?,
    })
}

impl ActivityRow {
    fn into_activity(self) -> Result<Activity> {
        let attendees: Vec<String> =
            serde_json::from_str(&self.attendees).map_err(InfraError::from)?;
        let action_items: Vec<ActionItem> =
            serde_json::from_str(&self.action_items).map_err(InfraError::from)?;

        let enrichment_status = match self.enrichment_state.as_str() {
            "pending" => EnrichmentStatus::Pending,
            "done" => EnrichmentStatus::Done,
            "failed" => {
                let kind = self
                    .enrichment_last_error
                    .as_deref()
                    .and_then(EnrichErrorKind::parse)
                    .ok_or_else(|| {
                        TermicalError::Storage(format!(
                            "unknown enrichment error kind: {:?}",
                            self.enrichment_last_error
                        ))
                    })?;
                EnrichmentStatus::Failed {
                    attempts: u32::try_from(self.enrichment_attempts.max(0)).unwrap_or(u32::MAX),
                    last_error: kind,
                }
            }
            other => {
                return Err(TermicalError::Storage(format!("unknown enrichment state: {other}")))
            }
        };

        Ok(Activity {
            event_id: self.event_id,
            title: self.title,
            description: self.description,
            start_time: timestamp_from_micros(self.start_us)?,
            end_time: timestamp_from_micros(self.end_us)?,
            attendees,
            content_fingerprint: self.content_fingerprint,
            ai_summary: self.ai_summary,
            action_items,
            enrichment_status,
            last_synced: timestamp_from_micros(self.last_synced_us)?,
        })
    }
}

fn status_columns(status: &EnrichmentStatus) -> (&'static str, u32, Option<&'static str>) {
    match status {
        EnrichmentStatus::Pending => ("pending", 0, None),
        EnrichmentStatus::Done => ("done", 0, None),
        EnrichmentStatus::Failed { attempts, last_error } => {
            ("failed", *attempts, Some(last_error.as_str()))
        }
    }
}

fn timestamp_from_micros(us: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| TermicalError::Storage(format!("timestamp out of range: {us}")))
}
