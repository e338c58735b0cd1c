//! Integration tests for on-disk database initialization
//!
//! Covers first-run creation, reopening an existing file, and the
//! uniqueness rules the ingestion path relies on.

use members_common::db::init::init_database;
use members_common::db::migrations::get_schema_version;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("members.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("members.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO subscribers (first_name, last_name, phone_number, client_member_id) VALUES ('a', 'b', '1', 'c1')",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.as_ref().err());
    let pool2 = pool2.unwrap();

    // Data survives reopening
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(get_schema_version(&pool2).await.unwrap(), 1);
}

#[tokio::test]
async fn test_phone_number_and_client_id_are_unique() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("members.db")).await.unwrap();

    sqlx::query(
        "INSERT INTO subscribers (first_name, last_name, phone_number, client_member_id) VALUES ('a', 'b', '1', 'c1')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let same_phone = sqlx::query(
        "INSERT INTO subscribers (first_name, last_name, phone_number, client_member_id) VALUES ('a', 'b', '1', 'c2')",
    )
    .execute(&pool)
    .await;
    assert!(same_phone.is_err(), "duplicate phone number accepted");

    let same_client_id = sqlx::query(
        "INSERT INTO subscribers (first_name, last_name, phone_number, client_member_id) VALUES ('a', 'b', '2', 'c1')",
    )
    .execute(&pool)
    .await;
    assert!(same_client_id.is_err(), "duplicate client member id accepted");
}

#[tokio::test]
async fn test_same_account_may_link_many_subscribers() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("members.db")).await.unwrap();

    for (phone, client) in [("1", "c1"), ("2", "c2")] {
        sqlx::query(
            "INSERT INTO subscribers (first_name, last_name, phone_number, client_member_id) VALUES ('a', 'b', ?, ?)",
        )
        .bind(phone)
        .bind(client)
        .execute(&pool)
        .await
        .unwrap();
    }

    sqlx::query("INSERT INTO providers (subscriber_id, account_id) VALUES (1, 'A1'), (2, 'A1')")
        .execute(&pool)
        .await
        .unwrap();

    let duplicate = sqlx::query("INSERT INTO providers (subscriber_id, account_id) VALUES (1, 'A1')")
        .execute(&pool)
        .await;
    assert!(duplicate.is_err(), "duplicate (subscriber, account) link accepted");
}
