//! Idempotent subscriber/provider upserts for batch ingestion
//!
//! A batch larger than [`MAX_CHUNK_ROWS`] is split from the tail into chunks of
//! at most [`MAX_CHUNK_ROWS`] rows. Every chunk but the leading remainder is
//! queued as its own job; the remainder is processed in place. Every row is
//! processed exactly once.
//!
//! Rows are processed sequentially and independently: one row's failure never
//! stops the chunk. The store's unique constraints settle races between
//! concurrently running chunks, so no locking is done here.

use members_common::db::{NewSubscriber, Subscriber};
use members_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::{providers, subscribers};
use crate::queue::{Job, JobQueue, SubmitError};
use crate::services::ingest::CsvRow;

/// Largest number of rows handled by one job
pub const MAX_CHUNK_ROWS: usize = 10_000;

/// Fields per upload row
const ROW_FIELDS: usize = 5;

/// How a row's subscriber was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberResolution {
    Created,
    Reused,
}

/// Result of linking a subscriber to an account id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderLink {
    Created,
    /// The pair already existed; not an error
    AlreadyLinked,
    /// The row carried no account id
    NotRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A required field was empty or absent
    MissingField(&'static str),
    /// Another subscriber already holds the phone number or client member id
    SubscriberConflict,
}

/// Outcome of processing one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Applied {
        subscriber_id: i64,
        subscriber: SubscriberResolution,
        provider: ProviderLink,
    },
    Skipped(SkipReason),
    Failed(String),
}

/// Tally of one processed chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    pub rows: usize,
    pub subscribers_created: usize,
    pub subscribers_reused: usize,
    pub providers_created: usize,
    pub providers_already_linked: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<RowOutcome>,
}

impl ChunkReport {
    fn record(&mut self, outcome: RowOutcome) {
        self.rows += 1;
        match &outcome {
            RowOutcome::Applied {
                subscriber,
                provider,
                ..
            } => {
                match subscriber {
                    SubscriberResolution::Created => self.subscribers_created += 1,
                    SubscriberResolution::Reused => self.subscribers_reused += 1,
                }
                match provider {
                    ProviderLink::Created => self.providers_created += 1,
                    ProviderLink::AlreadyLinked => self.providers_already_linked += 1,
                    ProviderLink::NotRequested => {}
                }
            }
            RowOutcome::Skipped(_) => self.skipped += 1,
            RowOutcome::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// A validated upload row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
    pub subscriber: NewSubscriber,
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    FieldCount(usize),
    MissingField(&'static str),
}

impl MemberRow {
    /// Unpack the five row fields; the account id is optional
    pub fn from_fields(fields: &[String]) -> std::result::Result<Self, RowError> {
        let [first_name, last_name, phone_number, client_member_id, account_id] = fields else {
            return Err(RowError::FieldCount(fields.len()));
        };

        let required = |value: &String, name: &'static str| {
            if value.is_empty() {
                Err(RowError::MissingField(name))
            } else {
                Ok(value.clone())
            }
        };

        Ok(Self {
            subscriber: NewSubscriber {
                first_name: required(first_name, "first_name")?,
                last_name: required(last_name, "last_name")?,
                phone_number: required(phone_number, "phone_number")?,
                client_member_id: required(client_member_id, "client_member_id")?,
            },
            account_id: (!account_id.is_empty()).then(|| account_id.clone()),
        })
    }
}

/// Split rows into chunks of at most `cap` rows, taking chunks off the tail
///
/// The last element is the leading remainder. Concatenating the chunks in
/// reverse order restores the original row order.
pub fn split_chunks(mut rows: Vec<CsvRow>, cap: usize) -> Vec<Vec<CsvRow>> {
    let cap = cap.max(1);
    let mut chunks = Vec::with_capacity(rows.len() / cap + 1);

    while rows.len() > cap {
        let tail = rows.split_off(rows.len() - cap);
        chunks.push(tail);
    }
    chunks.push(rows);

    chunks
}

/// Find the subscriber for the exact (phone, client id) pair or create it
///
/// Returns [`Error::Conflict`] when creation collides with a different
/// subscriber holding the phone number or client member id.
pub async fn resolve_subscriber(
    pool: &SqlitePool,
    new: &NewSubscriber,
) -> Result<(Subscriber, SubscriberResolution)> {
    if let Some(existing) =
        subscribers::find_by_phone_and_client_id(pool, &new.phone_number, &new.client_member_id)
            .await?
    {
        return Ok((existing, SubscriberResolution::Reused));
    }

    let created = subscribers::insert(pool, new).await?;
    Ok((created, SubscriberResolution::Created))
}

/// Link a subscriber to an account id, treating an existing link as success
pub async fn link_provider(
    pool: &SqlitePool,
    subscriber_id: i64,
    account_id: &str,
) -> Result<ProviderLink> {
    match providers::insert(pool, subscriber_id, account_id).await {
        Ok(_) => Ok(ProviderLink::Created),
        Err(Error::Conflict(_)) => {
            info!(
                subscriber_id,
                account_id, "Provider and subscriber combo already exists, skipping"
            );
            Ok(ProviderLink::AlreadyLinked)
        }
        Err(e) => Err(e),
    }
}

/// Executes ingestion jobs against the store
#[derive(Clone)]
pub struct UpsertWorker {
    db: SqlitePool,
    chunk_rows: usize,
}

impl UpsertWorker {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            chunk_rows: MAX_CHUNK_ROWS,
        }
    }

    /// Lower the chunk size; values above [`MAX_CHUNK_ROWS`] are capped
    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.clamp(1, MAX_CHUNK_ROWS);
        self
    }

    pub fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    /// Run one job; sub-chunks of a batch are submitted to `queue`
    pub async fn execute(&self, queue: &dyn JobQueue, job: Job) -> ChunkReport {
        match job {
            Job::Batch(rows) => self.run_batch(queue, rows).await,
            Job::Chunk(rows) => self.process_chunk(&rows).await,
        }
    }

    /// Queue all tail chunks and process the leading remainder in place
    ///
    /// A chunk that cannot be queued is processed in place instead, so no
    /// rows are dropped.
    pub async fn run_batch(&self, queue: &dyn JobQueue, rows: Vec<CsvRow>) -> ChunkReport {
        let total = rows.len();
        let mut chunks = split_chunks(rows, self.chunk_rows);
        let remainder = chunks.pop().unwrap_or_default();

        info!(
            rows = total,
            queued_chunks = chunks.len(),
            in_place = remainder.len(),
            "Splitting batch"
        );

        let mut report = ChunkReport::default();
        for chunk in chunks {
            let size = chunk.len();
            match queue.submit(Job::Chunk(chunk)) {
                Ok(job_id) => debug!(job_id = %job_id, rows = size, "Chunk queued"),
                Err(SubmitError(job)) => {
                    warn!(rows = size, "Job queue is shut down, processing chunk in place");
                    merge(&mut report, self.process_chunk(&job.into_rows()).await);
                }
            }
        }

        merge(&mut report, self.process_chunk(&remainder).await);
        report
    }

    /// Process rows sequentially; never aborts on a single row
    pub async fn process_chunk(&self, rows: &[CsvRow]) -> ChunkReport {
        let mut report = ChunkReport::default();

        for (index, row) in rows.iter().enumerate() {
            let outcome = self.process_row(row).await;
            match &outcome {
                RowOutcome::Applied { .. } => {}
                RowOutcome::Skipped(reason) => {
                    info!(row = index, reason = ?reason, "Skipping row");
                }
                RowOutcome::Failed(reason) => {
                    warn!(row = index, error = %reason, "Row failed");
                }
            }
            report.record(outcome);
        }

        info!(
            rows = report.rows,
            created = report.subscribers_created,
            reused = report.subscribers_reused,
            providers = report.providers_created,
            skipped = report.skipped,
            failed = report.failed,
            "Chunk processed"
        );
        report
    }

    /// Upsert one row
    pub async fn process_row(&self, row: &[String]) -> RowOutcome {
        let member = match MemberRow::from_fields(row) {
            Ok(member) => member,
            Err(RowError::MissingField(field)) => {
                return RowOutcome::Skipped(SkipReason::MissingField(field))
            }
            Err(RowError::FieldCount(found)) => {
                return RowOutcome::Failed(format!(
                    "expected {} fields, found {}",
                    ROW_FIELDS, found
                ))
            }
        };

        let (subscriber, resolution) = match resolve_subscriber(&self.db, &member.subscriber).await
        {
            Ok(resolved) => resolved,
            Err(Error::Conflict(_)) => {
                info!(
                    phone_number = %member.subscriber.phone_number,
                    client_member_id = %member.subscriber.client_member_id,
                    "Phone number or client member id already exists"
                );
                return RowOutcome::Skipped(SkipReason::SubscriberConflict);
            }
            Err(e) => return RowOutcome::Failed(e.to_string()),
        };

        let provider = match &member.account_id {
            Some(account_id) => match link_provider(&self.db, subscriber.id, account_id).await {
                Ok(link) => link,
                Err(e) => return RowOutcome::Failed(e.to_string()),
            },
            None => ProviderLink::NotRequested,
        };

        debug!(subscriber_id = subscriber.id, ?resolution, ?provider, "Row applied");
        RowOutcome::Applied {
            subscriber_id: subscriber.id,
            subscriber: resolution,
            provider,
        }
    }
}

fn merge(into: &mut ChunkReport, from: ChunkReport) {
    for outcome in from.outcomes {
        into.record(outcome);
    }
}
