//! Customer group CRUD and membership management.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::CustomerGroup;

/// Create a new customer group.
pub async fn create_group(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<CustomerGroup> {
    let now = Utc::now();
    let group = CustomerGroup {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        description: description.map(str::to_string),
        color: color.map(str::to_string),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO customer_groups (id, user_id, name, description, color, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&group.id)
    .bind(&group.user_id)
    .bind(&group.name)
    .bind(&group.description)
    .bind(&group.color)
    .bind(group.created_at)
    .bind(group.updated_at)
    .execute(pool)
    .await?;

    Ok(group)
}

/// Get a group by ID.
pub async fn get_group(pool: &SqlitePool, id: &str) -> Result<CustomerGroup> {
    sqlx::query_as::<_, CustomerGroup>("SELECT * FROM customer_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "CustomerGroup",
            id: id.to_string(),
        })
}

/// List a user's groups with their derived member counts.
pub async fn list_groups(pool: &SqlitePool, user_id: &str) -> Result<Vec<(CustomerGroup, i64)>> {
    let groups = sqlx::query_as::<_, CustomerGroup>(
        r#"
        SELECT * FROM customer_groups
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let count = member_count(pool, &group.id).await?;
        out.push((group, count));
    }

    Ok(out)
}

/// Update a group's editable fields.
pub async fn update_group(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE customer_groups
        SET name = ?, description = ?, color = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(color)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "CustomerGroup",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Delete a group. Memberships cascade.
pub async fn delete_group(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM customer_groups WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "CustomerGroup",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Add customers to a group. Existing memberships are left alone.
pub async fn add_members(pool: &SqlitePool, group_id: &str, customer_ids: &[String]) -> Result<()> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    for customer_id in customer_ids {
        sqlx::query(
            r#"
            INSERT INTO customer_group_memberships (id, group_id, customer_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(group_id, customer_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(group_id)
        .bind(customer_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Remove a customer from a group.
pub async fn remove_member(pool: &SqlitePool, group_id: &str, customer_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM customer_group_memberships
        WHERE group_id = ? AND customer_id = ?
        "#,
    )
    .bind(group_id)
    .bind(customer_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// List the customer IDs in a group.
pub async fn member_ids(pool: &SqlitePool, group_id: &str) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT customer_id FROM customer_group_memberships
        WHERE group_id = ?
        ORDER BY created_at
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Count members of a group.
pub async fn member_count(pool: &SqlitePool, group_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM customer_group_memberships WHERE group_id = ?
        "#,
    )
    .bind(group_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
