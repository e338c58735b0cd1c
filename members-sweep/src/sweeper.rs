//! Event message retention sweep
//!
//! A message is cleanable when its status is `complete` or when it was created
//! at or before the cutoff: midnight of the current local day minus the
//! threshold in days. Cleanable ids are deleted in fixed-size chunks, one
//! transaction per chunk, so an interrupted sweep leaves a consistent table
//! that the next run finishes.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone, Utc};
use members_common::db::EventStatus;
use members_common::time::days_before_start_of_day;
use members_common::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

/// SQLite's bound-parameter limit caps the ids per DELETE statement
pub const MAX_CHUNK_SIZE: usize = 32_766;

/// Oldest creation time that is still retained, exclusive
///
/// Returns [`Error::InvalidInput`] when the threshold reaches past the
/// representable calendar.
pub fn cutoff<Tz: TimeZone>(now: &DateTime<Tz>, threshold_days: u32) -> Result<DateTime<Tz>> {
    days_before_start_of_day(now, threshold_days).ok_or_else(|| {
        Error::InvalidInput(format!(
            "threshold of {} days is out of range",
            threshold_days
        ))
    })
}

/// What one sweep did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Ids selected for deletion
    pub matched: usize,
    /// Rows actually removed
    pub deleted: u64,
    /// DELETE statements issued
    pub chunks: usize,
    pub cutoff: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Ids of cleanable event messages in id order
pub async fn find_cleanable(pool: &SqlitePool, cutoff_secs: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM event_messages WHERE status = ? OR created_at <= ? ORDER BY id",
    )
    .bind(EventStatus::Complete.as_str())
    .bind(cutoff_secs)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Delete one chunk of ids in its own transaction
pub async fn delete_chunk(pool: &SqlitePool, ids: &[i64]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM event_messages WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let mut tx = pool.begin().await?;
    let result = builder.build().execute(&mut *tx).await?;
    tx.commit().await?;

    Ok(result.rows_affected())
}

/// Retention sweeper over the event_messages table
pub struct Sweeper {
    db: SqlitePool,
    threshold_days: u32,
    chunk_size: usize,
}

impl Sweeper {
    /// Returns [`Error::InvalidInput`] for a chunk size of 0 or above [`MAX_CHUNK_SIZE`]
    pub fn new(db: SqlitePool, threshold_days: u32, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidInput(format!(
                "chunk size must be between 1 and {}, got {}",
                MAX_CHUNK_SIZE, chunk_size
            )));
        }

        Ok(Self {
            db,
            threshold_days,
            chunk_size,
        })
    }

    pub fn threshold_days(&self) -> u32 {
        self.threshold_days
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Sweep relative to the current local time
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(&Local::now()).await
    }

    /// Sweep relative to `now`; the cutoff is computed in `now`'s time zone
    pub async fn sweep_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<SweepReport> {
        let started = Instant::now();
        let cutoff = cutoff(now, self.threshold_days)?.with_timezone(&Utc);

        info!(
            threshold_days = self.threshold_days,
            chunk_size = self.chunk_size,
            cutoff = %cutoff,
            "Starting event message cleanup"
        );

        let ids = find_cleanable(&self.db, cutoff.timestamp()).await?;

        let mut deleted = 0;
        let mut chunks = 0;
        for chunk in ids.chunks(self.chunk_size) {
            let removed = delete_chunk(&self.db, chunk).await?;
            chunks += 1;
            deleted += removed;
            debug!(chunk = chunks, removed, "Deleted event message chunk");
        }

        let report = SweepReport {
            matched: ids.len(),
            deleted,
            chunks,
            cutoff,
            elapsed: started.elapsed(),
        };

        info!(
            matched = report.matched,
            deleted = report.deleted,
            chunks = report.chunks,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Finished event message cleanup"
        );
        Ok(report)
    }
}
