//! Subscription purchase and payment confirmation.
//!
//! Starting a plan creates an `inactive` subscription plus a `pending`
//! payment transaction. Confirmation resolves the transaction and activates
//! the subscription for one billing period; failure resolves the transaction
//! and leaves the subscription inactive.

use chrono::{Duration, Utc};
use database::{payment as payment_repo, subscription as subscription_repo};
use database::{PaymentStatus, PaymentTransaction, Subscription};
use sqlx::SqlitePool;

use crate::error::{Result, WorkflowError};
use crate::session::{Action, Session};

/// Length of one paid period.
const BILLING_PERIOD_DAYS: i64 = 30;

/// Start a subscription purchase.
pub async fn start_subscription(
    pool: &SqlitePool,
    session: &Session,
    plan_type: &str,
    price: f64,
    payment_method: &str,
    phone_number: Option<&str>,
) -> Result<(Subscription, PaymentTransaction)> {
    session.authorize(Action::ManageSubscription)?;

    if plan_type.trim().is_empty() {
        return Err(WorkflowError::Validation("plan type is required".to_string()));
    }
    if price <= 0.0 {
        return Err(WorkflowError::Validation("price must be positive".to_string()));
    }

    let subscription =
        subscription_repo::create_subscription(pool, &session.user_id, plan_type, "RWF").await?;
    let transaction = payment_repo::create_transaction(
        pool,
        &session.user_id,
        Some(&subscription.id),
        payment_method,
        price,
        "RWF",
        phone_number,
    )
    .await?;

    tracing::info!(
        subscription_id = %subscription.id,
        transaction_id = %transaction.id,
        plan = %plan_type,
        "subscription started, awaiting payment"
    );
    Ok((subscription, transaction))
}

/// Confirm a pending payment and activate its subscription.
pub async fn confirm_payment(
    pool: &SqlitePool,
    session: &Session,
    transaction_id: &str,
    reference_number: Option<&str>,
) -> Result<Subscription> {
    session.authorize(Action::ManageSubscription)?;

    let transaction = payment_repo::get_transaction(pool, transaction_id).await?;
    let subscription_id = transaction.subscription_id.clone().ok_or_else(|| {
        WorkflowError::Validation("transaction has no linked subscription".to_string())
    })?;

    payment_repo::resolve_transaction(
        pool,
        transaction_id,
        PaymentStatus::Completed,
        reference_number,
        None,
    )
    .await
    .map_err(|e| match e {
        database::DatabaseError::StatusConflict { .. } => WorkflowError::IllegalTransition {
            entity: "PaymentTransaction",
            from: "(already resolved)".to_string(),
            to: "completed",
        },
        other => WorkflowError::Database(other),
    })?;

    let start = Utc::now();
    let end = start + Duration::days(BILLING_PERIOD_DAYS);
    subscription_repo::activate(pool, &subscription_id, start, end, transaction.amount).await?;

    tracing::info!(subscription_id = %subscription_id, "subscription activated");
    subscription_repo::get_subscription(pool, &subscription_id)
        .await
        .map_err(Into::into)
}

/// Record a failed payment attempt. The subscription stays inactive.
pub async fn fail_payment(
    pool: &SqlitePool,
    transaction_id: &str,
    error_message: &str,
) -> Result<()> {
    payment_repo::resolve_transaction(
        pool,
        transaction_id,
        PaymentStatus::Failed,
        None,
        Some(error_message),
    )
    .await?;

    tracing::warn!(transaction_id = %transaction_id, error = %error_message, "payment failed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{Database, SubscriptionStatus};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_start_and_confirm_activates_subscription() {
        let db = test_db().await;
        let session = Session::new("user-1", None);

        let (subscription, transaction) = start_subscription(
            db.pool(),
            &session,
            "pro",
            15_000.0,
            "mtn_momo",
            Some("+250788000000"),
        )
        .await
        .unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Inactive);
        assert_eq!(transaction.status, PaymentStatus::Pending);

        let active = confirm_payment(db.pool(), &session, &transaction.id, Some("REF-123"))
            .await
            .unwrap();
        assert_eq!(active.status, SubscriptionStatus::Active);
        assert_eq!(active.price_paid, Some(15_000.0));
        assert!(active.start_date.is_some());
        assert!(active.end_date.is_some());

        let current = subscription_repo::get_active_for_user(db.pool(), "user-1")
            .await
            .unwrap();
        assert_eq!(current.map(|s| s.id), Some(subscription.id));
    }

    #[tokio::test]
    async fn test_confirm_twice_is_illegal() {
        let db = test_db().await;
        let session = Session::new("user-1", None);

        let (_, transaction) =
            start_subscription(db.pool(), &session, "pro", 15_000.0, "mtn_momo", None)
                .await
                .unwrap();

        confirm_payment(db.pool(), &session, &transaction.id, None).await.unwrap();
        let result = confirm_payment(db.pool(), &session, &transaction.id, None).await;
        assert!(matches!(result, Err(WorkflowError::IllegalTransition { .. })));
    }

    #[tokio::test]
    async fn test_failed_payment_leaves_subscription_inactive() {
        let db = test_db().await;
        let session = Session::new("user-1", None);

        let (subscription, transaction) =
            start_subscription(db.pool(), &session, "starter", 5_000.0, "airtel_money", None)
                .await
                .unwrap();

        fail_payment(db.pool(), &transaction.id, "insufficient funds").await.unwrap();

        let fetched = subscription_repo::get_subscription(db.pool(), &subscription.id)
            .await
            .unwrap();
        assert_eq!(fetched.status, SubscriptionStatus::Inactive);

        let resolved = payment_repo::get_transaction(db.pool(), &transaction.id).await.unwrap();
        assert_eq!(resolved.status, PaymentStatus::Failed);
        assert_eq!(resolved.error_message.as_deref(), Some("insufficient funds"));
    }
}
