//! Customer CRUD operations.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{Customer, NewCustomer};

/// Create a new customer for a user.
pub async fn create_customer(
    pool: &SqlitePool,
    user_id: &str,
    new: &NewCustomer,
) -> Result<Customer> {
    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: new.name.clone(),
        phone_number: new.phone_number.clone(),
        segment: new.segment.clone(),
        last_message_sent: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO customers (id, user_id, name, phone_number, segment, last_message_sent, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.user_id)
    .bind(&customer.name)
    .bind(&customer.phone_number)
    .bind(&customer.segment)
    .bind(customer.last_message_sent)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(pool)
    .await?;

    Ok(customer)
}

/// Insert many customers at once (bulk import). Returns the inserted rows.
pub async fn create_customers(
    pool: &SqlitePool,
    user_id: &str,
    new: &[NewCustomer],
) -> Result<Vec<Customer>> {
    let mut inserted = Vec::with_capacity(new.len());
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    for item in new {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO customers (id, user_id, name, phone_number, segment, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&item.name)
        .bind(&item.phone_number)
        .bind(&item.segment)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        inserted.push(Customer {
            id,
            user_id: user_id.to_string(),
            name: item.name.clone(),
            phone_number: item.phone_number.clone(),
            segment: item.segment.clone(),
            last_message_sent: None,
            created_at: now,
            updated_at: now,
        });
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Get a customer by ID.
pub async fn get_customer(pool: &SqlitePool, id: &str) -> Result<Customer> {
    sqlx::query_as::<_, Customer>(
        r#"
        SELECT * FROM customers WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Customer",
        id: id.to_string(),
    })
}

/// List a user's customers, newest first.
pub async fn list_customers(pool: &SqlitePool, user_id: &str) -> Result<Vec<Customer>> {
    let customers = sqlx::query_as::<_, Customer>(
        r#"
        SELECT * FROM customers
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(customers)
}

/// Fetch the subset of `ids` that belong to `user_id`.
pub async fn get_customers_by_ids(
    pool: &SqlitePool,
    user_id: &str,
    ids: &[String],
) -> Result<Vec<Customer>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT * FROM customers WHERE user_id = ? AND id IN ({placeholders})"
    );

    let mut query = sqlx::query_as::<_, Customer>(&sql).bind(user_id);
    for id in ids {
        query = query.bind(id);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Update a customer's editable fields.
pub async fn update_customer(
    pool: &SqlitePool,
    id: &str,
    new: &NewCustomer,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET name = ?, phone_number = ?, segment = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&new.name)
    .bind(&new.phone_number)
    .bind(&new.segment)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Customer",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Delete a customer by ID.
pub async fn delete_customer(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM customers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Customer",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Delete a set of customers owned by a user. Returns how many were removed.
pub async fn delete_customers(
    pool: &SqlitePool,
    user_id: &str,
    ids: &[String],
) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM customers WHERE user_id = ? AND id IN ({placeholders})");

    let mut query = sqlx::query(&sql).bind(user_id);
    for id in ids {
        query = query.bind(id);
    }

    Ok(query.execute(pool).await?.rows_affected())
}

/// Stamp `last_message_sent` for a set of customers.
pub async fn touch_last_message_sent(
    pool: &SqlitePool,
    ids: &[String],
    at: DateTime<Utc>,
) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "UPDATE customers SET last_message_sent = ?, updated_at = ? WHERE id IN ({placeholders})"
    );

    let mut query = sqlx::query(&sql).bind(at).bind(at);
    for id in ids {
        query = query.bind(id);
    }
    query.execute(pool).await?;

    Ok(())
}

/// Count a user's customers.
pub async fn count_customers(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM customers WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
