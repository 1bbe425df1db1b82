//! Subscription storage.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::Subscription;
use crate::status::SubscriptionStatus;

/// Create a subscription in `inactive` status, awaiting payment.
pub async fn create_subscription(
    pool: &SqlitePool,
    user_id: &str,
    plan_type: &str,
    currency: &str,
) -> Result<Subscription> {
    let now = Utc::now();
    let subscription = Subscription {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        plan_type: plan_type.to_string(),
        status: SubscriptionStatus::Inactive,
        start_date: None,
        end_date: None,
        price_paid: None,
        currency: currency.to_string(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, user_id, plan_type, status, currency, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&subscription.id)
    .bind(&subscription.user_id)
    .bind(&subscription.plan_type)
    .bind(subscription.status)
    .bind(&subscription.currency)
    .bind(subscription.created_at)
    .bind(subscription.updated_at)
    .execute(pool)
    .await?;

    Ok(subscription)
}

/// Get a subscription by ID.
pub async fn get_subscription(pool: &SqlitePool, id: &str) -> Result<Subscription> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Subscription",
            id: id.to_string(),
        })
}

/// The user's current active subscription, if any.
pub async fn get_active_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<Subscription>> {
    let subscription = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT * FROM subscriptions
        WHERE user_id = ? AND status = 'active'
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(subscription)
}

/// Activate a subscription after a confirmed payment.
pub async fn activate(
    pool: &SqlitePool,
    id: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    price_paid: f64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions
        SET status = ?, start_date = ?, end_date = ?, price_paid = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(SubscriptionStatus::Active)
    .bind(start_date)
    .bind(end_date)
    .bind(price_paid)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Subscription",
            id: id.to_string(),
        });
    }

    Ok(())
}
