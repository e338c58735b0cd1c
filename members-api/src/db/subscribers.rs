//! Subscriber queries

use members_common::db::{NewSubscriber, Subscriber};
use members_common::{Error, Result};
use sqlx::SqlitePool;

const SELECT_SUBSCRIBER: &str =
    "SELECT id, first_name, last_name, phone_number, client_member_id FROM subscribers";

/// Exact match on the (phone number, client member id) pair
pub async fn find_by_phone_and_client_id(
    pool: &SqlitePool,
    phone_number: &str,
    client_member_id: &str,
) -> Result<Option<Subscriber>> {
    let sql = format!("{SELECT_SUBSCRIBER} WHERE phone_number = ? AND client_member_id = ?");
    let subscriber = sqlx::query_as::<_, Subscriber>(&sql)
        .bind(phone_number)
        .bind(client_member_id)
        .fetch_optional(pool)
        .await?;

    Ok(subscriber)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Subscriber>> {
    let sql = format!("{SELECT_SUBSCRIBER} WHERE id = ?");
    Ok(sqlx::query_as::<_, Subscriber>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_phone(pool: &SqlitePool, phone_number: &str) -> Result<Option<Subscriber>> {
    let sql = format!("{SELECT_SUBSCRIBER} WHERE phone_number = ?");
    Ok(sqlx::query_as::<_, Subscriber>(&sql)
        .bind(phone_number)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_client_member_id(
    pool: &SqlitePool,
    client_member_id: &str,
) -> Result<Option<Subscriber>> {
    let sql = format!("{SELECT_SUBSCRIBER} WHERE client_member_id = ?");
    Ok(sqlx::query_as::<_, Subscriber>(&sql)
        .bind(client_member_id)
        .fetch_optional(pool)
        .await?)
}

/// Distinct subscribers linked to an account id, ordered by subscriber id
pub async fn find_by_account_id(pool: &SqlitePool, account_id: &str) -> Result<Vec<Subscriber>> {
    let subscribers = sqlx::query_as::<_, Subscriber>(
        r#"
        SELECT s.id, s.first_name, s.last_name, s.phone_number, s.client_member_id
        FROM subscribers s
        WHERE s.id IN (SELECT subscriber_id FROM providers WHERE account_id = ?)
        ORDER BY s.id
        "#,
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    Ok(subscribers)
}

/// Insert a subscriber
///
/// Returns [`Error::Conflict`] when the phone number or client member id is
/// already taken by another subscriber.
pub async fn insert(pool: &SqlitePool, new: &NewSubscriber) -> Result<Subscriber> {
    let result = sqlx::query(
        r#"
        INSERT INTO subscribers (first_name, last_name, phone_number, client_member_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.phone_number)
    .bind(&new.client_member_id)
    .execute(pool)
    .await
    .map_err(Error::from_write)?;

    Ok(Subscriber {
        id: result.last_insert_rowid(),
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        phone_number: new.phone_number.clone(),
        client_member_id: new.client_member_id.clone(),
    })
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
        .fetch_one(pool)
        .await?)
}
