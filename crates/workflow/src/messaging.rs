//! Broadcast sending, scheduling, and due-message dispatch.
//!
//! A send resolves the recipient list, renders the body per customer, hands
//! each message to the [`transport::MessageTransport`], and records one
//! history row plus one delivery log per recipient. A transport failure for
//! one recipient is logged as a failed delivery and does not abort the rest
//! of the batch.

use chrono::{DateTime, Utc};
use database::{
    customer as customer_repo, message_history as history_repo,
    scheduled_message as scheduled_repo,
};
use database::{DeliveryStatus, MessageHistoryEntry, ScheduleStatus, ScheduledMessage};
use sqlx::SqlitePool;
use transport::{Delivery, MessageTransport};

use crate::error::{Result, WorkflowError};
use crate::session::{Action, Session};
use crate::template;

/// A broadcast composed by the user.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub title: String,
    pub body: String,
    pub customer_ids: Vec<String>,
}

/// What happened to a broadcast, per recipient bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// History row recording the broadcast.
    pub message_id: String,
    /// Recipients the channel accepted.
    pub sent: usize,
    /// Recipients with confirmed delivery.
    pub delivered: usize,
    /// Recipients the channel refused.
    pub failed: usize,
}

fn validate(msg: &OutgoingMessage) -> Result<()> {
    if msg.body.trim().is_empty() {
        return Err(WorkflowError::Validation("message body is required".to_string()));
    }
    if msg.customer_ids.is_empty() {
        return Err(WorkflowError::Validation(
            "at least one recipient is required".to_string(),
        ));
    }
    Ok(())
}

/// Send a broadcast immediately.
pub async fn send_now(
    pool: &SqlitePool,
    transport: &dyn MessageTransport,
    session: &Session,
    msg: &OutgoingMessage,
) -> Result<SendOutcome> {
    session.authorize(Action::SendMessage)?;
    validate(msg)?;

    let customers =
        customer_repo::get_customers_by_ids(pool, &session.user_id, &msg.customer_ids).await?;
    if customers.is_empty() {
        return Err(WorkflowError::Validation(
            "none of the selected customers exist".to_string(),
        ));
    }

    deliver(pool, transport, &session.user_id, &msg.title, &msg.body, &customers).await
}

/// Shared delivery path for immediate sends and due scheduled messages.
async fn deliver(
    pool: &SqlitePool,
    transport: &dyn MessageTransport,
    user_id: &str,
    title: &str,
    body: &str,
    customers: &[database::Customer],
) -> Result<SendOutcome> {
    let sent_at = Utc::now();
    let entry: MessageHistoryEntry = history_repo::append_history(
        pool,
        user_id,
        title,
        body,
        sent_at,
        customers.len() as i64,
    )
    .await?;

    let mut outcome = SendOutcome {
        message_id: entry.id.clone(),
        sent: 0,
        delivered: 0,
        failed: 0,
    };
    let mut reached: Vec<String> = Vec::new();

    for customer in customers {
        let rendered = template::render(body, &template::customer_vars(customer));

        match transport.send(&customer.phone_number, &rendered).await {
            Ok(receipt) => {
                let (status, delivered_at) = match receipt.delivery {
                    Delivery::Delivered => (DeliveryStatus::Delivered, Some(receipt.timestamp)),
                    Delivery::Sent => (DeliveryStatus::Sent, None),
                };
                history_repo::append_log(
                    pool,
                    user_id,
                    &entry.id,
                    &customer.id,
                    &customer.phone_number,
                    status,
                    None,
                    Some(receipt.timestamp),
                    delivered_at,
                )
                .await?;

                outcome.sent += 1;
                if status == DeliveryStatus::Delivered {
                    outcome.delivered += 1;
                }
                reached.push(customer.id.clone());
            }
            Err(e) => {
                tracing::warn!(customer_id = %customer.id, error = %e, "delivery failed");
                history_repo::append_log(
                    pool,
                    user_id,
                    &entry.id,
                    &customer.id,
                    &customer.phone_number,
                    DeliveryStatus::Failed,
                    Some(&e.to_string()),
                    None,
                    None,
                )
                .await?;
                outcome.failed += 1;
            }
        }
    }

    customer_repo::touch_last_message_sent(pool, &reached, sent_at).await?;

    tracing::info!(
        message_id = %entry.id,
        sent = outcome.sent,
        delivered = outcome.delivered,
        failed = outcome.failed,
        "broadcast finished"
    );
    Ok(outcome)
}

/// Schedule a broadcast for later delivery.
pub async fn schedule(
    pool: &SqlitePool,
    session: &Session,
    msg: &OutgoingMessage,
    scheduled_for: DateTime<Utc>,
) -> Result<ScheduledMessage> {
    session.authorize(Action::SendMessage)?;
    validate(msg)?;

    if scheduled_for <= Utc::now() {
        return Err(WorkflowError::Validation(
            "scheduled time must be in the future".to_string(),
        ));
    }

    let message = scheduled_repo::create_scheduled_message(
        pool,
        &session.user_id,
        &msg.title,
        &msg.body,
        scheduled_for,
        msg.customer_ids.clone(),
    )
    .await?;

    tracing::info!(message_id = %message.id, scheduled_for = %scheduled_for, "broadcast scheduled");
    Ok(message)
}

/// Cancel a scheduled broadcast. Only `scheduled` messages can be cancelled;
/// a missing id is a reported error, not a crash.
pub async fn cancel_scheduled(pool: &SqlitePool, session: &Session, id: &str) -> Result<()> {
    session.authorize(Action::SendMessage)?;

    scheduled_repo::transition_from_scheduled(pool, id, ScheduleStatus::Cancelled)
        .await
        .map_err(|e| match e {
            database::DatabaseError::StatusConflict { .. } => WorkflowError::IllegalTransition {
                entity: "ScheduledMessage",
                from: "(not scheduled)".to_string(),
                to: ScheduleStatus::Cancelled.as_str(),
            },
            other => WorkflowError::Database(other),
        })?;

    tracing::info!(message_id = %id, "scheduled broadcast cancelled");
    Ok(())
}

/// Dispatch every scheduled message that is due at `now`.
///
/// Each message is claimed first (guarded `scheduled -> sent` flip) and then
/// delivered, so two dispatchers racing on the same row send it once. Returns
/// the number of messages dispatched.
pub async fn dispatch_due(
    pool: &SqlitePool,
    transport: &dyn MessageTransport,
    now: DateTime<Utc>,
) -> Result<usize> {
    let due = scheduled_repo::list_due(pool, now).await?;
    let mut dispatched = 0;

    for message in due {
        match scheduled_repo::transition_from_scheduled(pool, &message.id, ScheduleStatus::Sent)
            .await
        {
            Ok(()) => {}
            Err(database::DatabaseError::StatusConflict { .. }) => continue, // another dispatcher won
            Err(e) => return Err(e.into()),
        }

        let customers = customer_repo::get_customers_by_ids(
            pool,
            &message.user_id,
            &message.customer_ids.0,
        )
        .await?;

        deliver(
            pool,
            transport,
            &message.user_id,
            &message.message_title,
            &message.message_body,
            &customers,
        )
        .await?;
        dispatched += 1;
    }

    Ok(dispatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use database::{Database, NewCustomer};
    use transport::{MemoryTransport, NullTransport};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn seed_customers(db: &Database, user_id: &str, count: usize) -> Vec<String> {
        let mut ids = Vec::new();
        for i in 0..count {
            let c = customer_repo::create_customer(
                db.pool(),
                user_id,
                &NewCustomer {
                    name: format!("Customer {i}"),
                    phone_number: format!("+25078800{i:04}"),
                    segment: None,
                },
            )
            .await
            .unwrap();
            ids.push(c.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_send_now_records_history_logs_and_timestamps() {
        let db = test_db().await;
        let session = Session::new("user-1", None);
        let transport = MemoryTransport::new();

        let ids = seed_customers(&db, "user-1", 3).await;
        let outcome = send_now(
            db.pool(),
            &transport,
            &session,
            &OutgoingMessage {
                title: "Promo".to_string(),
                body: "Hello {name}!".to_string(),
                customer_ids: ids.clone(),
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.sent, 3);
        assert_eq!(outcome.delivered, 3);
        assert_eq!(outcome.failed, 0);

        // One history row with the full recipient count.
        let history = history_repo::list_history(db.pool(), "user-1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].customer_count, 3);

        // Rendered per customer.
        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().any(|m| m.body == "Hello Customer 0!"));

        // Every recipient was stamped.
        for id in &ids {
            let c = customer_repo::get_customer(db.pool(), id).await.unwrap();
            assert!(c.last_message_sent.is_some());
        }
    }

    #[tokio::test]
    async fn test_send_now_partial_failure_is_recorded_not_fatal() {
        let db = test_db().await;
        let session = Session::new("user-1", None);
        let transport = MemoryTransport::new();

        let ids = seed_customers(&db, "user-1", 2).await;
        transport.fail_recipient("+250788000000");

        let outcome = send_now(
            db.pool(),
            &transport,
            &session,
            &OutgoingMessage {
                title: "Promo".to_string(),
                body: "Hi".to_string(),
                customer_ids: ids.clone(),
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.sent, 1);
        assert_eq!(outcome.failed, 1);

        let failed = history_repo::count_logs_with_status(
            db.pool(),
            "user-1",
            DeliveryStatus::Failed,
        )
        .await
        .unwrap();
        assert_eq!(failed, 1);

        // The failed recipient keeps no last-message stamp.
        let failed_customer = customer_repo::get_customer(db.pool(), &ids[0]).await.unwrap();
        assert!(failed_customer.last_message_sent.is_none());
    }

    #[tokio::test]
    async fn test_send_now_rejects_empty_input() {
        let db = test_db().await;
        let session = Session::new("user-1", None);
        let transport = NullTransport::new();

        let result = send_now(
            db.pool(),
            &transport,
            &session,
            &OutgoingMessage {
                title: "t".to_string(),
                body: "  ".to_string(),
                customer_ids: vec!["x".to_string()],
            },
        )
        .await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let result = send_now(
            db.pool(),
            &transport,
            &session,
            &OutgoingMessage {
                title: "t".to_string(),
                body: "hello".to_string(),
                customer_ids: vec![],
            },
        )
        .await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }

    #[tokio::test]
    async fn test_schedule_enforces_future_time_and_count_invariant() {
        let db = test_db().await;
        let session = Session::new("user-1", None);

        let ids = seed_customers(&db, "user-1", 2).await;
        let msg = OutgoingMessage {
            title: "Later".to_string(),
            body: "See you soon".to_string(),
            customer_ids: ids,
        };

        let result = schedule(db.pool(), &session, &msg, Utc::now() - Duration::hours(1)).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let scheduled = schedule(db.pool(), &session, &msg, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(scheduled.status, ScheduleStatus::Scheduled);
        assert_eq!(scheduled.customer_count, 2);
        assert_eq!(scheduled.customer_ids.0.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_scheduled_removes_from_active_list() {
        let db = test_db().await;
        let session = Session::new("user-1", None);

        let ids = seed_customers(&db, "user-1", 1).await;
        let scheduled = schedule(
            db.pool(),
            &session,
            &OutgoingMessage {
                title: "Later".to_string(),
                body: "Hi".to_string(),
                customer_ids: ids,
            },
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();

        cancel_scheduled(db.pool(), &session, &scheduled.id).await.unwrap();
        assert!(scheduled_repo::list_active(db.pool(), "user-1").await.unwrap().is_empty());

        // Cancelling again is an illegal transition, not a crash.
        let result = cancel_scheduled(db.pool(), &session, &scheduled.id).await;
        assert!(matches!(result, Err(WorkflowError::IllegalTransition { .. })));

        // And a missing id is a reported NotFound.
        let result = cancel_scheduled(db.pool(), &session, "no-such-id").await;
        assert!(matches!(
            result,
            Err(WorkflowError::Database(database::DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_due_sends_and_flips_status() {
        let db = test_db().await;
        let session = Session::new("user-1", None);
        let transport = MemoryTransport::new();

        let ids = seed_customers(&db, "user-1", 2).await;
        let scheduled = schedule(
            db.pool(),
            &session,
            &OutgoingMessage {
                title: "Reminder".to_string(),
                body: "Hello {name}".to_string(),
                customer_ids: ids,
            },
            Utc::now() + Duration::minutes(5),
        )
        .await
        .unwrap();

        // Not yet due.
        assert_eq!(dispatch_due(db.pool(), &transport, Utc::now()).await.unwrap(), 0);
        assert_eq!(transport.sent_count(), 0);

        // Due now.
        let later = Utc::now() + Duration::minutes(10);
        assert_eq!(dispatch_due(db.pool(), &transport, later).await.unwrap(), 1);
        assert_eq!(transport.sent_count(), 2);

        let fetched = scheduled_repo::get_scheduled_message(db.pool(), &scheduled.id)
            .await
            .unwrap();
        assert_eq!(fetched.status, ScheduleStatus::Sent);

        // Re-dispatch is a no-op.
        assert_eq!(dispatch_due(db.pool(), &transport, later).await.unwrap(), 0);
        assert_eq!(transport.sent_count(), 2);
    }
}
