//! Agent task lifecycle.
//!
//! ```text
//! pending   --approve-->           approved
//! approved  --submit_for_review--> submitted_for_review
//! approved  --mark_done-->         completed            (skips review)
//! submitted_for_review --approve_work--> completed
//! submitted_for_review --reject_work-->  approved       (redo loop)
//! any non-terminal     --cancel-->       cancelled
//! ```
//!
//! Commission is snapshotted into `commission_amount` the moment a task
//! leaves the agent's hands (submit or direct completion), so later edits to
//! price or rate never rewrite settled history.

use chrono::Utc;
use database::task as repo;
use database::{Task, TaskStatus};
use sqlx::SqlitePool;

use crate::error::{Result, WorkflowError};
use crate::session::{Action, Session};

fn snapshot_commission(task: &Task) -> f64 {
    task.price * task.commission_rate / 100.0
}

fn illegal(from: TaskStatus, to: TaskStatus) -> WorkflowError {
    WorkflowError::IllegalTransition {
        entity: "Task",
        from: from.as_str().to_string(),
        to: to.as_str(),
    }
}

/// Mark an approved task completed directly, without the review step.
///
/// The shortcut the agent UI exposes; it still snapshots commission and
/// stamps `completed_at`.
pub async fn mark_done(pool: &SqlitePool, session: &Session, task_id: &str) -> Result<Task> {
    session.authorize(Action::MarkTaskDone)?;

    let task = repo::get_task(pool, task_id).await?;
    if task.status != TaskStatus::Approved {
        return Err(illegal(task.status, TaskStatus::Completed));
    }

    let patch = repo::TransitionPatch {
        completed_at: Some(Utc::now()),
        commission_amount: Some(snapshot_commission(&task)),
        ..Default::default()
    };
    repo::transition_status(pool, task_id, TaskStatus::Approved, TaskStatus::Completed, &patch)
        .await?;

    tracing::info!(task_id = %task_id, "task marked done");
    repo::get_task(pool, task_id).await.map_err(Into::into)
}

/// Submit finished work for admin review, attaching the result artifact and
/// the agent's notes.
pub async fn submit_for_review(
    pool: &SqlitePool,
    session: &Session,
    task_id: &str,
    result_file_url: Option<&str>,
    agent_notes: Option<&str>,
) -> Result<Task> {
    session.authorize(Action::SubmitWork)?;

    let task = repo::get_task(pool, task_id).await?;
    if task.status != TaskStatus::Approved {
        return Err(illegal(task.status, TaskStatus::SubmittedForReview));
    }

    let patch = repo::TransitionPatch {
        completed_at: Some(Utc::now()),
        commission_amount: Some(snapshot_commission(&task)),
        result_file_url: result_file_url.map(str::to_string),
        agent_notes: agent_notes.map(str::to_string),
    };
    repo::transition_status(
        pool,
        task_id,
        TaskStatus::Approved,
        TaskStatus::SubmittedForReview,
        &patch,
    )
    .await?;

    tracing::info!(task_id = %task_id, "work submitted for review");
    repo::get_task(pool, task_id).await.map_err(Into::into)
}

/// Admin accepts submitted work.
pub async fn approve_work(pool: &SqlitePool, session: &Session, task_id: &str) -> Result<Task> {
    session.authorize(Action::ReviewTask)?;

    let task = repo::get_task(pool, task_id).await?;
    if task.status != TaskStatus::SubmittedForReview {
        return Err(illegal(task.status, TaskStatus::Completed));
    }

    repo::transition_status(
        pool,
        task_id,
        TaskStatus::SubmittedForReview,
        TaskStatus::Completed,
        &repo::TransitionPatch::default(),
    )
    .await?;

    tracing::info!(task_id = %task_id, "task review approved");
    repo::get_task(pool, task_id).await.map_err(Into::into)
}

/// Admin sends submitted work back to the agent for a redo.
///
/// The admin's feedback replaces the agent's notes, matching the single
/// notes field on the row; there is no notes history.
pub async fn reject_work(
    pool: &SqlitePool,
    session: &Session,
    task_id: &str,
    notes: Option<&str>,
) -> Result<Task> {
    session.authorize(Action::ReviewTask)?;

    let task = repo::get_task(pool, task_id).await?;
    if task.status != TaskStatus::SubmittedForReview {
        return Err(illegal(task.status, TaskStatus::Approved));
    }

    let feedback = match notes {
        Some(n) if !n.trim().is_empty() => format!("Admin feedback: {n}"),
        _ => "Task rejected by admin, please redo.".to_string(),
    };
    let patch = repo::TransitionPatch {
        agent_notes: Some(feedback),
        ..Default::default()
    };
    repo::transition_status(
        pool,
        task_id,
        TaskStatus::SubmittedForReview,
        TaskStatus::Approved,
        &patch,
    )
    .await?;

    tracing::info!(task_id = %task_id, "task review rejected");
    repo::get_task(pool, task_id).await.map_err(Into::into)
}

/// Cancel a task from any non-terminal state.
pub async fn cancel(pool: &SqlitePool, session: &Session, task_id: &str) -> Result<Task> {
    session.authorize(Action::CancelTask)?;

    let task = repo::get_task(pool, task_id).await?;
    if matches!(task.status, TaskStatus::Completed | TaskStatus::Cancelled) {
        return Err(illegal(task.status, TaskStatus::Cancelled));
    }

    repo::transition_status(
        pool,
        task_id,
        task.status,
        TaskStatus::Cancelled,
        &repo::TransitionPatch::default(),
    )
    .await?;

    tracing::info!(task_id = %task_id, "task cancelled");
    repo::get_task(pool, task_id).await.map_err(Into::into)
}
