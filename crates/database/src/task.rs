//! Task storage, agent queues, and guarded status transitions.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{NewTask, Task};
use crate::status::TaskStatus;

/// Create a standalone task (not linked to a service request).
pub async fn create_task(pool: &SqlitePool, new: &NewTask) -> Result<Task> {
    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4().to_string(),
        title: new.title.clone(),
        description: new.description.clone(),
        admin_id: new.admin_id.clone(),
        agent_id: new.agent_id.clone(),
        client_name: new.client_name.clone(),
        service_type: new.service_type.clone(),
        price: new.price,
        commission_rate: new.commission_rate,
        commission_amount: None,
        status: new.status,
        service_request_id: new.service_request_id.clone(),
        result_file_url: None,
        agent_notes: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO tasks
            (id, title, description, admin_id, agent_id, client_name, service_type, price,
             commission_rate, status, service_request_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.admin_id)
    .bind(&task.agent_id)
    .bind(&task.client_name)
    .bind(&task.service_type)
    .bind(task.price)
    .bind(task.commission_rate)
    .bind(task.status)
    .bind(&task.service_request_id)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(pool)
    .await?;

    Ok(task)
}

/// Get a task by ID.
pub async fn get_task(pool: &SqlitePool, id: &str) -> Result<Task> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Task",
            id: id.to_string(),
        })
}

/// List an agent's tasks in a given status, most recently completed first
/// when completion times exist, otherwise newest first.
pub async fn list_agent_tasks(
    pool: &SqlitePool,
    agent_id: &str,
    status: TaskStatus,
) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE agent_id = ? AND status = ?
        ORDER BY completed_at DESC, created_at DESC
        "#,
    )
    .bind(agent_id)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

/// List every task awaiting admin review, most recently submitted first.
pub async fn list_submitted_for_review(pool: &SqlitePool) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE status = 'submitted_for_review'
        ORDER BY completed_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

/// Completed tasks whose completion time falls within `[start, end)`, most
/// recent first. Feeds the weekly payout aggregation.
pub async fn list_completed_in_window(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE status = 'completed' AND completed_at >= ? AND completed_at < ?
        ORDER BY completed_at DESC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

/// Patch applied alongside a guarded status transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionPatch {
    pub completed_at: Option<DateTime<Utc>>,
    pub commission_amount: Option<f64>,
    pub result_file_url: Option<String>,
    pub agent_notes: Option<String>,
}

/// Move a task from `from` to `to`, applying any patch fields in the same
/// write. Fails with `StatusConflict` if the row isn't in `from`.
pub async fn transition_status(
    pool: &SqlitePool,
    id: &str,
    from: TaskStatus,
    to: TaskStatus,
    patch: &TransitionPatch,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET status = ?,
            completed_at = COALESCE(?, completed_at),
            commission_amount = COALESCE(?, commission_amount),
            result_file_url = COALESCE(?, result_file_url),
            agent_notes = COALESCE(?, agent_notes),
            updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to)
    .bind(patch.completed_at)
    .bind(patch.commission_amount)
    .bind(&patch.result_file_url)
    .bind(&patch.agent_notes)
    .bind(Utc::now())
    .bind(id)
    .bind(from)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;

        if exists == 0 {
            return Err(DatabaseError::NotFound {
                entity: "Task",
                id: id.to_string(),
            });
        }
        return Err(DatabaseError::StatusConflict {
            entity: "Task",
            id: id.to_string(),
            expected: from.as_str(),
        });
    }

    Ok(())
}

/// Update a task's price and commission rate. Snapshotted commission on
/// already-completed work is unaffected.
pub async fn update_pricing(
    pool: &SqlitePool,
    id: &str,
    price: f64,
    commission_rate: f64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE tasks SET price = ?, commission_rate = ?, updated_at = ? WHERE id = ?
        "#,
    )
    .bind(price)
    .bind(commission_rate)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Task",
            id: id.to_string(),
        });
    }

    Ok(())
}
