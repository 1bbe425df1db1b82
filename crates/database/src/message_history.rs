//! Message history and per-recipient delivery logs.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{MessageHistoryEntry, MessageLog};
use crate::status::DeliveryStatus;

/// Append a history row for a sent broadcast.
pub async fn append_history(
    pool: &SqlitePool,
    user_id: &str,
    title: &str,
    body: &str,
    sent_at: DateTime<Utc>,
    customer_count: i64,
) -> Result<MessageHistoryEntry> {
    let entry = MessageHistoryEntry {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        message_title: Some(title.to_string()),
        message_body: Some(body.to_string()),
        message_text: None,
        sent_at,
        customer_count,
    };

    sqlx::query(
        r#"
        INSERT INTO message_history (id, user_id, message_title, message_body, message_text, sent_at, customer_count)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.user_id)
    .bind(&entry.message_title)
    .bind(&entry.message_body)
    .bind(&entry.message_text)
    .bind(entry.sent_at)
    .bind(entry.customer_count)
    .execute(pool)
    .await?;

    Ok(entry)
}

/// List a user's history, newest first.
pub async fn list_history(pool: &SqlitePool, user_id: &str) -> Result<Vec<MessageHistoryEntry>> {
    let entries = sqlx::query_as::<_, MessageHistoryEntry>(
        r#"
        SELECT * FROM message_history
        WHERE user_id = ?
        ORDER BY sent_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// History entries sent at or after `since`, ascending.
pub async fn list_history_since(
    pool: &SqlitePool,
    user_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<MessageHistoryEntry>> {
    let entries = sqlx::query_as::<_, MessageHistoryEntry>(
        r#"
        SELECT * FROM message_history
        WHERE user_id = ? AND sent_at >= ?
        ORDER BY sent_at ASC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Count a user's history rows.
pub async fn count_history(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM message_history WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Append a delivery log row for one recipient of a broadcast.
#[allow(clippy::too_many_arguments)]
pub async fn append_log(
    pool: &SqlitePool,
    user_id: &str,
    message_id: &str,
    customer_id: &str,
    phone_number: &str,
    delivery_status: DeliveryStatus,
    error_message: Option<&str>,
    sent_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
) -> Result<MessageLog> {
    let log = MessageLog {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        message_id: message_id.to_string(),
        customer_id: customer_id.to_string(),
        phone_number: phone_number.to_string(),
        delivery_status,
        error_message: error_message.map(str::to_string),
        sent_at,
        delivered_at,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO message_logs
            (id, user_id, message_id, customer_id, phone_number, delivery_status, error_message, sent_at, delivered_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&log.id)
    .bind(&log.user_id)
    .bind(&log.message_id)
    .bind(&log.customer_id)
    .bind(&log.phone_number)
    .bind(log.delivery_status)
    .bind(&log.error_message)
    .bind(log.sent_at)
    .bind(log.delivered_at)
    .bind(log.created_at)
    .execute(pool)
    .await?;

    Ok(log)
}

/// Count a user's logs in a given delivery status.
pub async fn count_logs_with_status(
    pool: &SqlitePool,
    user_id: &str,
    status: DeliveryStatus,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM message_logs
        WHERE user_id = ? AND delivery_status = ?
        "#,
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Delivery logs created at or after `since`, ascending.
pub async fn list_logs_since(
    pool: &SqlitePool,
    user_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<MessageLog>> {
    let logs = sqlx::query_as::<_, MessageLog>(
        r#"
        SELECT * FROM message_logs
        WHERE user_id = ? AND created_at >= ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}
