//! Agent payout persistence.
//!
//! A payout row exists only once settled. The `UNIQUE(agent_id, week_start)`
//! index is the idempotency key: marking the same agent paid twice for one
//! week surfaces as [`DatabaseError::AlreadyExists`] instead of a duplicate
//! paid record.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::AgentPayout;
use crate::status::PayoutStatus;

/// Persist a settled payout for one agent and week.
pub async fn insert_paid(
    pool: &SqlitePool,
    agent_id: &str,
    week_start: NaiveDate,
    week_end: NaiveDate,
    tasks_completed: i64,
    total_commission: f64,
    paid_at: DateTime<Utc>,
) -> Result<AgentPayout> {
    let payout = AgentPayout {
        id: Uuid::new_v4().to_string(),
        agent_id: agent_id.to_string(),
        week_start,
        week_end,
        tasks_completed,
        total_commission,
        status: PayoutStatus::Paid,
        paid_at: Some(paid_at),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO agent_payouts
            (id, agent_id, week_start, week_end, tasks_completed, total_commission, status, paid_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payout.id)
    .bind(&payout.agent_id)
    .bind(payout.week_start)
    .bind(payout.week_end)
    .bind(payout.tasks_completed)
    .bind(payout.total_commission)
    .bind(payout.status)
    .bind(payout.paid_at)
    .bind(payout.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "AgentPayout",
                    id: format!("{agent_id}/{week_start}"),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(payout)
}

/// Look up a payout for one agent and week.
pub async fn get_for_week(
    pool: &SqlitePool,
    agent_id: &str,
    week_start: NaiveDate,
) -> Result<Option<AgentPayout>> {
    let payout = sqlx::query_as::<_, AgentPayout>(
        r#"
        SELECT * FROM agent_payouts
        WHERE agent_id = ? AND week_start = ?
        "#,
    )
    .bind(agent_id)
    .bind(week_start)
    .fetch_optional(pool)
    .await?;

    Ok(payout)
}

/// List an agent's settled payouts, newest week first.
pub async fn list_for_agent(pool: &SqlitePool, agent_id: &str) -> Result<Vec<AgentPayout>> {
    let payouts = sqlx::query_as::<_, AgentPayout>(
        r#"
        SELECT * FROM agent_payouts
        WHERE agent_id = ?
        ORDER BY week_start DESC
        "#,
    )
    .bind(agent_id)
    .fetch_all(pool)
    .await?;

    Ok(payouts)
}
