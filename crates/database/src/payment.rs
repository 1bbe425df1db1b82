//! Payment transaction storage.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::PaymentTransaction;
use crate::status::PaymentStatus;

/// Record a pending payment attempt.
pub async fn create_transaction(
    pool: &SqlitePool,
    user_id: &str,
    subscription_id: Option<&str>,
    payment_method: &str,
    amount: f64,
    currency: &str,
    phone_number: Option<&str>,
) -> Result<PaymentTransaction> {
    let transaction = PaymentTransaction {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        subscription_id: subscription_id.map(str::to_string),
        payment_method: payment_method.to_string(),
        amount,
        currency: currency.to_string(),
        status: PaymentStatus::Pending,
        phone_number: phone_number.map(str::to_string),
        reference_number: None,
        error_message: None,
        processed_at: None,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO payment_transactions
            (id, user_id, subscription_id, payment_method, amount, currency, status, phone_number, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.user_id)
    .bind(&transaction.subscription_id)
    .bind(&transaction.payment_method)
    .bind(transaction.amount)
    .bind(&transaction.currency)
    .bind(transaction.status)
    .bind(&transaction.phone_number)
    .bind(transaction.created_at)
    .execute(pool)
    .await?;

    Ok(transaction)
}

/// Get a transaction by ID.
pub async fn get_transaction(pool: &SqlitePool, id: &str) -> Result<PaymentTransaction> {
    sqlx::query_as::<_, PaymentTransaction>("SELECT * FROM payment_transactions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "PaymentTransaction",
            id: id.to_string(),
        })
}

/// List a user's transactions, newest first.
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<PaymentTransaction>> {
    let transactions = sqlx::query_as::<_, PaymentTransaction>(
        r#"
        SELECT * FROM payment_transactions
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(transactions)
}

/// Resolve a pending transaction to a terminal status. Fails with
/// `StatusConflict` if the transaction was already resolved.
pub async fn resolve_transaction(
    pool: &SqlitePool,
    id: &str,
    status: PaymentStatus,
    reference_number: Option<&str>,
    error_message: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE payment_transactions
        SET status = ?, reference_number = ?, error_message = ?, processed_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(status)
    .bind(reference_number)
    .bind(error_message)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payment_transactions WHERE id = ?",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        if exists == 0 {
            return Err(DatabaseError::NotFound {
                entity: "PaymentTransaction",
                id: id.to_string(),
            });
        }
        return Err(DatabaseError::StatusConflict {
            entity: "PaymentTransaction",
            id: id.to_string(),
            expected: "pending",
        });
    }

    Ok(())
}
