//! Scheduled message storage and guarded status transitions.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::ScheduledMessage;
use crate::status::ScheduleStatus;

/// Create a scheduled message. The denormalized `customer_count` is always
/// written as the length of the recipient list.
pub async fn create_scheduled_message(
    pool: &SqlitePool,
    user_id: &str,
    title: &str,
    body: &str,
    scheduled_for: DateTime<Utc>,
    customer_ids: Vec<String>,
) -> Result<ScheduledMessage> {
    let now = Utc::now();
    let message = ScheduledMessage {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        message_title: title.to_string(),
        message_body: body.to_string(),
        scheduled_for,
        status: ScheduleStatus::Scheduled,
        customer_count: customer_ids.len() as i64,
        customer_ids: Json(customer_ids),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO scheduled_messages
            (id, user_id, message_title, message_body, scheduled_for, status, customer_ids, customer_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.id)
    .bind(&message.user_id)
    .bind(&message.message_title)
    .bind(&message.message_body)
    .bind(message.scheduled_for)
    .bind(message.status)
    .bind(&message.customer_ids)
    .bind(message.customer_count)
    .bind(message.created_at)
    .bind(message.updated_at)
    .execute(pool)
    .await?;

    Ok(message)
}

/// Get a scheduled message by ID.
pub async fn get_scheduled_message(pool: &SqlitePool, id: &str) -> Result<ScheduledMessage> {
    sqlx::query_as::<_, ScheduledMessage>("SELECT * FROM scheduled_messages WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "ScheduledMessage",
            id: id.to_string(),
        })
}

/// List a user's still-scheduled messages, soonest first.
pub async fn list_active(pool: &SqlitePool, user_id: &str) -> Result<Vec<ScheduledMessage>> {
    let messages = sqlx::query_as::<_, ScheduledMessage>(
        r#"
        SELECT * FROM scheduled_messages
        WHERE user_id = ? AND status = 'scheduled'
        ORDER BY scheduled_for ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// List every scheduled message due at or before `now`, across users.
pub async fn list_due(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<ScheduledMessage>> {
    let messages = sqlx::query_as::<_, ScheduledMessage>(
        r#"
        SELECT * FROM scheduled_messages
        WHERE status = 'scheduled' AND scheduled_for <= ?
        ORDER BY scheduled_for ASC
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// Flip a message from `scheduled` to `to`. Fails with [`DatabaseError::StatusConflict`]
/// if another session already claimed it, or `NotFound` if the row is gone.
pub async fn transition_from_scheduled(
    pool: &SqlitePool,
    id: &str,
    to: ScheduleStatus,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE scheduled_messages
        SET status = ?, updated_at = ?
        WHERE id = ? AND status = 'scheduled'
        "#,
    )
    .bind(to)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Distinguish a missing row from a raced transition.
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM scheduled_messages WHERE id = ?",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        if exists == 0 {
            return Err(DatabaseError::NotFound {
                entity: "ScheduledMessage",
                id: id.to_string(),
            });
        }
        return Err(DatabaseError::StatusConflict {
            entity: "ScheduledMessage",
            id: id.to_string(),
            expected: "scheduled",
        });
    }

    Ok(())
}
