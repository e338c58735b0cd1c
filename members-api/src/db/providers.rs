//! Provider link queries

use members_common::db::Provider;
use members_common::{Error, Result};
use sqlx::SqlitePool;

/// Link a subscriber to an account id
///
/// Returns [`Error::Conflict`] when the pair already exists.
pub async fn insert(pool: &SqlitePool, subscriber_id: i64, account_id: &str) -> Result<Provider> {
    let result = sqlx::query("INSERT INTO providers (subscriber_id, account_id) VALUES (?, ?)")
        .bind(subscriber_id)
        .bind(account_id)
        .execute(pool)
        .await
        .map_err(Error::from_write)?;

    Ok(Provider {
        id: result.last_insert_rowid(),
        subscriber_id,
        account_id: account_id.to_string(),
    })
}

/// Providers of one subscriber in creation order
pub async fn list_for_subscriber(pool: &SqlitePool, subscriber_id: i64) -> Result<Vec<Provider>> {
    let providers = sqlx::query_as::<_, Provider>(
        "SELECT id, subscriber_id, account_id FROM providers WHERE subscriber_id = ? ORDER BY id",
    )
    .bind(subscriber_id)
    .fetch_all(pool)
    .await?;

    Ok(providers)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM providers")
        .fetch_one(pool)
        .await?)
}
