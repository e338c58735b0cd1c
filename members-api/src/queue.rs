//! Background job queue for batch ingestion
//!
//! Submitting a job returns a [`JobId`] immediately; the submitter never
//! observes the job's result. Outcomes are reported through tracing and the
//! [`ChunkReport`] each execution produces.
//!
//! Two executors:
//! - [`WorkerPool`]: shared channel drained by N tokio worker tasks
//! - [`InlineQueue`]: collects jobs and runs them on the caller's task

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::services::ingest::CsvRow;
use crate::services::upsert::{ChunkReport, UpsertWorker};

/// Handle of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unit of asynchronous work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// A whole upload; the worker splits it into chunks
    Batch(Vec<CsvRow>),
    /// At most one chunk of rows, processed in place
    Chunk(Vec<CsvRow>),
}

impl Job {
    pub fn kind(&self) -> &'static str {
        match self {
            Job::Batch(_) => "batch",
            Job::Chunk(_) => "chunk",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Job::Batch(rows) | Job::Chunk(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_rows(self) -> Vec<CsvRow> {
        match self {
            Job::Batch(rows) | Job::Chunk(rows) => rows,
        }
    }
}

/// The queue no longer accepts jobs; the rejected job is handed back
#[derive(Debug, Error)]
#[error("job queue is shut down")]
pub struct SubmitError(pub Job);

/// Fire-and-forget job submission
pub trait JobQueue: Send + Sync {
    fn submit(&self, job: Job) -> Result<JobId, SubmitError>;
}

struct QueuedJob {
    id: JobId,
    job: Job,
}

/// Submitting side of a [`WorkerPool`]
#[derive(Clone)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<QueuedJob>,
}

impl JobQueue for JobSender {
    fn submit(&self, job: Job) -> Result<JobId, SubmitError> {
        let id = JobId::new();
        let (kind, rows) = (job.kind(), job.len());
        self.tx
            .send(QueuedJob { id, job })
            .map_err(|rejected| SubmitError(rejected.0.job))?;
        debug!(job_id = %id, kind, rows, "Job queued");
        Ok(id)
    }
}

/// Weak submitting side held by workers so the channel closes on shutdown
struct WorkerSender {
    tx: mpsc::WeakUnboundedSender<QueuedJob>,
}

impl JobQueue for WorkerSender {
    fn submit(&self, job: Job) -> Result<JobId, SubmitError> {
        match self.tx.upgrade() {
            Some(tx) => JobSender { tx }.submit(job),
            None => Err(SubmitError(job)),
        }
    }
}

/// Pool of worker tasks executing ingestion jobs
pub struct WorkerPool {
    sender: JobSender,
    worker_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `num_workers` workers (at least one) draining a shared queue
    pub fn new(worker: UpsertWorker, num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        info!(num_workers, "Initializing ingestion worker pool");

        let (tx, rx) = mpsc::unbounded_channel::<QueuedJob>();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut worker_handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let receiver = Arc::clone(&rx);
            let requeue = WorkerSender { tx: tx.downgrade() };
            let worker = worker.clone();

            worker_handles.push(tokio::spawn(async move {
                run_worker(worker_id, receiver, requeue, worker).await;
            }));
        }

        Self {
            sender: JobSender { tx },
            worker_handles,
        }
    }

    /// Cloneable submitting handle
    pub fn sender(&self) -> JobSender {
        self.sender.clone()
    }

    /// Stop accepting jobs, let workers drain the queue, and join them
    ///
    /// Jobs are only drained once every [`JobSender`] clone has been dropped.
    pub async fn shutdown(self) {
        drop(self.sender);

        for handle in self.worker_handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Ingestion worker panicked");
            }
        }

        info!("Ingestion worker pool shut down");
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<QueuedJob>>>,
    requeue: WorkerSender,
    worker: UpsertWorker,
) {
    debug!(worker_id, "Ingestion worker started");

    loop {
        let queued = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };

        let Some(QueuedJob { id, job }) = queued else {
            debug!(worker_id, "Ingestion worker shutting down");
            break;
        };

        info!(worker_id, job_id = %id, kind = job.kind(), rows = job.len(), "Running job");
        let report = worker.execute(&requeue, job).await;
        info!(
            worker_id,
            job_id = %id,
            processed = report.rows,
            skipped = report.skipped,
            failed = report.failed,
            "Job finished"
        );
    }
}

/// In-process queue: records submissions and runs them on demand
#[derive(Default)]
pub struct InlineQueue {
    pending: Mutex<VecDeque<(JobId, Job)>>,
}

impl InlineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<(JobId, Job)>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn pending_len(&self) -> usize {
        self.lock().len()
    }

    /// Remove and return every queued job without running it
    pub fn take_pending(&self) -> Vec<Job> {
        self.lock().drain(..).map(|(_, job)| job).collect()
    }

    /// Run queued jobs, including any they submit, until the queue is empty
    pub async fn run_pending(&self, worker: &UpsertWorker) -> Vec<ChunkReport> {
        let mut reports = Vec::new();

        loop {
            let next = self.lock().pop_front();
            let Some((id, job)) = next else {
                break;
            };

            debug!(job_id = %id, kind = job.kind(), "Running inline job");
            reports.push(worker.execute(self, job).await);
        }

        reports
    }
}

impl JobQueue for InlineQueue {
    fn submit(&self, job: Job) -> Result<JobId, SubmitError> {
        let id = JobId::new();
        self.lock().push_back((id, job));
        Ok(id)
    }
}
