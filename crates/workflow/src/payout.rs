//! Weekly payout aggregation and settlement.
//!
//! A payout week runs Sunday through Saturday. Aggregation is a pure read:
//! group the week's completed tasks by agent and sum commission. Settlement
//! (`mark_as_paid`) persists one `paid` row per agent per week; the unique
//! index underneath makes repeated clicks harmless.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use database::{payout as payout_repo, task as task_repo};
use database::{AgentPayout, DatabaseError, Task};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{Result, WorkflowError};
use crate::session::{Action, Session};

/// A Sunday-to-Saturday payout window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    /// The window containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let days_from_sunday = date.weekday().num_days_from_sunday() as i64;
        let start = date - Duration::days(days_from_sunday);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    /// Half-open datetime bounds: midnight at the start of Sunday up to, but
    /// not including, midnight of the following Sunday.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start.and_time(NaiveTime::MIN).and_utc();
        let end = (self.end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
        (start, end)
    }
}

/// Aggregated commission owed to one agent for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutSummary {
    pub agent_id: String,
    pub week: WeekWindow,
    pub tasks_completed: i64,
    pub total_commission: f64,
}

/// Compute per-agent payout summaries for the window.
///
/// Tasks with no agent are skipped. Agents appear in the order their most
/// recently completed task was fetched (most-recent-first underneath).
/// Re-running without settling changes nothing and returns the same output.
pub async fn compute_weekly(pool: &SqlitePool, week: WeekWindow) -> Result<Vec<PayoutSummary>> {
    let (start, end) = week.bounds();
    let tasks = task_repo::list_completed_in_window(pool, start, end).await?;

    let mut summaries: Vec<PayoutSummary> = Vec::new();
    for task in &tasks {
        let Some(agent_id) = task.agent_id.as_deref() else {
            continue;
        };

        match summaries.iter_mut().find(|s| s.agent_id == agent_id) {
            Some(summary) => {
                summary.tasks_completed += 1;
                summary.total_commission += task.commission();
            }
            None => summaries.push(PayoutSummary {
                agent_id: agent_id.to_string(),
                week,
                tasks_completed: 1,
                total_commission: task.commission(),
            }),
        }
    }

    Ok(summaries)
}

/// The window's completed tasks, most recent first, for the detail view.
pub async fn completed_tasks(pool: &SqlitePool, week: WeekWindow) -> Result<Vec<Task>> {
    let (start, end) = week.bounds();
    task_repo::list_completed_in_window(pool, start, end).await.map_err(Into::into)
}

/// Settle one agent's week: recompute their summary and persist a `paid`
/// payout row. A second settlement for the same agent and week fails with
/// [`WorkflowError::AlreadyPaid`] and writes nothing.
pub async fn mark_as_paid(
    pool: &SqlitePool,
    session: &Session,
    agent_id: &str,
    week: WeekWindow,
) -> Result<AgentPayout> {
    session.authorize(Action::MarkPayoutPaid)?;

    let summaries = compute_weekly(pool, week).await?;
    let summary = summaries
        .into_iter()
        .find(|s| s.agent_id == agent_id)
        .ok_or_else(|| {
            WorkflowError::Validation(format!(
                "agent {agent_id} has no completed tasks in week starting {}",
                week.start
            ))
        })?;

    let payout = payout_repo::insert_paid(
        pool,
        agent_id,
        week.start,
        week.end,
        summary.tasks_completed,
        summary.total_commission,
        Utc::now(),
    )
    .await
    .map_err(|e| match e {
        DatabaseError::AlreadyExists { .. } => WorkflowError::AlreadyPaid {
            agent_id: agent_id.to_string(),
            week_start: week.start.to_string(),
        },
        other => WorkflowError::Database(other),
    })?;

    tracing::info!(
        agent_id = %agent_id,
        week_start = %week.start,
        total_commission = payout.total_commission,
        "payout marked paid"
    );
    Ok(payout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{mark_done, submit_for_review};
    use database::{Database, NewTask, TaskStatus};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn completed_task(db: &Database, agent_id: &str, price: f64, rate: f64) {
        let task = task_repo::create_task(
            db.pool(),
            &NewTask {
                title: "work".to_string(),
                description: None,
                admin_id: Some("admin-1".to_string()),
                agent_id: Some(agent_id.to_string()),
                client_name: "Client".to_string(),
                service_type: "documents".to_string(),
                price,
                commission_rate: rate,
                status: TaskStatus::Approved,
                service_request_id: None,
            },
        )
        .await
        .unwrap();

        mark_done(db.pool(), &Session::agent(agent_id), &task.id).await.unwrap();
    }

    #[test]
    fn test_week_window_is_sunday_to_saturday() {
        // 2024-03-06 is a Wednesday.
        let week = WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert_eq!(week.start, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()); // Sunday
        assert_eq!(week.end, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()); // Saturday

        // A Sunday starts its own week.
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        assert_eq!(WeekWindow::containing(sunday).start, sunday);

        // A Saturday closes the same week.
        let saturday = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            WeekWindow::containing(saturday).start,
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()
        );
    }

    #[tokio::test]
    async fn test_compute_weekly_sums_commission_per_agent() {
        let db = test_db().await;

        completed_task(&db, "agent-1", 10_000.0, 50.0).await; // 5000
        completed_task(&db, "agent-1", 4_000.0, 25.0).await; // 1000
        completed_task(&db, "agent-2", 20_000.0, 10.0).await; // 2000

        let week = WeekWindow::containing(Utc::now().date_naive());
        let summaries = compute_weekly(db.pool(), week).await.unwrap();
        assert_eq!(summaries.len(), 2);

        let one = summaries.iter().find(|s| s.agent_id == "agent-1").unwrap();
        assert_eq!(one.tasks_completed, 2);
        assert_eq!(one.total_commission, 6_000.0);

        let two = summaries.iter().find(|s| s.agent_id == "agent-2").unwrap();
        assert_eq!(two.tasks_completed, 1);
        assert_eq!(two.total_commission, 2_000.0);

        // Re-running is idempotent.
        let again = compute_weekly(db.pool(), week).await.unwrap();
        assert_eq!(again, summaries);
    }

    #[tokio::test]
    async fn test_tasks_outside_window_are_excluded() {
        let db = test_db().await;
        completed_task(&db, "agent-1", 10_000.0, 50.0).await;

        // A week far in the past sees nothing.
        let old_week = WeekWindow::containing(NaiveDate::from_ymd_opt(2020, 1, 8).unwrap());
        let summaries = compute_weekly(db.pool(), old_week).await.unwrap();
        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn test_window_boundary_at_end_of_saturday() {
        let db = test_db().await;
        completed_task(&db, "agent-1", 10_000.0, 50.0).await;

        let week = WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        let (_, end) = week.bounds();

        // The very last instant of Saturday still belongs to this week.
        sqlx::query("UPDATE tasks SET completed_at = ?")
            .bind(end - Duration::nanoseconds(1))
            .execute(db.pool())
            .await
            .unwrap();
        let summaries = compute_weekly(db.pool(), week).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].tasks_completed, 1);

        // Midnight Sunday belongs to the next week, never to both.
        sqlx::query("UPDATE tasks SET completed_at = ?")
            .bind(end)
            .execute(db.pool())
            .await
            .unwrap();
        assert!(compute_weekly(db.pool(), week).await.unwrap().is_empty());

        let next = WeekWindow::containing(week.end + Duration::days(1));
        let summaries = compute_weekly(db.pool(), next).await.unwrap();
        assert_eq!(summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_review_path_counts_toward_payout() {
        let db = test_db().await;
        let agent = Session::agent("agent-1");
        let admin = Session::admin("admin-1");

        let task = task_repo::create_task(
            db.pool(),
            &NewTask {
                title: "reviewed work".to_string(),
                description: None,
                admin_id: Some("admin-1".to_string()),
                agent_id: Some("agent-1".to_string()),
                client_name: "Client".to_string(),
                service_type: "documents".to_string(),
                price: 8_000.0,
                commission_rate: 50.0,
                status: TaskStatus::Approved,
                service_request_id: None,
            },
        )
        .await
        .unwrap();

        submit_for_review(db.pool(), &agent, &task.id, None, None).await.unwrap();
        // Still under review: not part of any payout.
        let week = WeekWindow::containing(Utc::now().date_naive());
        assert!(compute_weekly(db.pool(), week).await.unwrap().is_empty());

        crate::task::approve_work(db.pool(), &admin, &task.id).await.unwrap();
        let summaries = compute_weekly(db.pool(), week).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_commission, 4_000.0);
    }

    #[tokio::test]
    async fn test_mark_as_paid_is_idempotent() {
        let db = test_db().await;
        let admin = Session::admin("admin-1");

        completed_task(&db, "agent-1", 10_000.0, 50.0).await;
        let week = WeekWindow::containing(Utc::now().date_naive());

        let payout = mark_as_paid(db.pool(), &admin, "agent-1", week).await.unwrap();
        assert_eq!(payout.total_commission, 5_000.0);
        assert_eq!(payout.tasks_completed, 1);
        assert!(payout.paid_at.is_some());

        // Second click: no duplicate paid record.
        let result = mark_as_paid(db.pool(), &admin, "agent-1", week).await;
        assert!(matches!(result, Err(WorkflowError::AlreadyPaid { .. })));
        assert_eq!(
            payout_repo::list_for_agent(db.pool(), "agent-1").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_mark_as_paid_requires_admin() {
        let db = test_db().await;

        completed_task(&db, "agent-1", 10_000.0, 50.0).await;
        let week = WeekWindow::containing(Utc::now().date_naive());

        let result =
            mark_as_paid(db.pool(), &Session::agent("agent-1"), "agent-1", week).await;
        assert!(matches!(result, Err(WorkflowError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_mark_as_paid_with_no_completed_tasks_fails() {
        let db = test_db().await;
        let admin = Session::admin("admin-1");

        let week = WeekWindow::containing(Utc::now().date_naive());
        let result = mark_as_paid(db.pool(), &admin, "agent-9", week).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }
}
