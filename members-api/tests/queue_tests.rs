//! Worker pool tests against an on-disk database
//!
//! Several workers write concurrently, so these use a real file (WAL mode,
//! pooled connections) instead of the single-connection in-memory database.

use members_api::db::{providers, subscribers};
use members_api::queue::{Job, JobQueue, WorkerPool};
use members_api::services::ingest::CsvRow;
use members_api::services::upsert::UpsertWorker;
use members_common::db::init_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("members.db")).await.unwrap();
    (dir, pool)
}

fn rows(count: usize, account: &str) -> Vec<CsvRow> {
    (0..count)
        .map(|i| {
            vec![
                format!("First{}", i),
                format!("Last{}", i),
                format!("555{:07}", i),
                format!("CM-{}", i),
                account.to_string(),
            ]
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_ingests_batch_split_across_workers() {
    let (_dir, pool) = setup_db().await;
    let worker = UpsertWorker::new(pool.clone()).with_chunk_rows(100);
    let worker_pool = WorkerPool::new(worker, 4);

    // 250 rows: two queued chunks plus a remainder processed in place
    let sender = worker_pool.sender();
    sender.submit(Job::Batch(rows(250, "ACC"))).unwrap();
    drop(sender);

    worker_pool.shutdown().await;

    assert_eq!(subscribers::count(&pool).await.unwrap(), 250);
    assert_eq!(providers::count(&pool).await.unwrap(), 250);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_concurrent_duplicate_batches_are_idempotent() {
    let (_dir, pool) = setup_db().await;
    let worker_pool = WorkerPool::new(UpsertWorker::new(pool.clone()), 4);

    let sender = worker_pool.sender();
    for _ in 0..3 {
        sender.submit(Job::Batch(rows(200, "ACC"))).unwrap();
    }
    drop(sender);

    worker_pool.shutdown().await;

    assert_eq!(subscribers::count(&pool).await.unwrap(), 200);
    assert_eq!(providers::count(&pool).await.unwrap(), 200);
}
