//! Message template CRUD operations.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::MessageTemplate;

/// Create a new template.
pub async fn create_template(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    content: &str,
    category: Option<&str>,
    variables: Vec<String>,
) -> Result<MessageTemplate> {
    let now = Utc::now();
    let template = MessageTemplate {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        content: content.to_string(),
        category: category.map(str::to_string),
        variables: Json(variables),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO message_templates (id, user_id, name, content, category, variables, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&template.id)
    .bind(&template.user_id)
    .bind(&template.name)
    .bind(&template.content)
    .bind(&template.category)
    .bind(&template.variables)
    .bind(template.is_active)
    .bind(template.created_at)
    .bind(template.updated_at)
    .execute(pool)
    .await?;

    Ok(template)
}

/// Get a template by ID.
pub async fn get_template(pool: &SqlitePool, id: &str) -> Result<MessageTemplate> {
    sqlx::query_as::<_, MessageTemplate>("SELECT * FROM message_templates WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "MessageTemplate",
            id: id.to_string(),
        })
}

/// List a user's templates, newest first.
pub async fn list_templates(pool: &SqlitePool, user_id: &str) -> Result<Vec<MessageTemplate>> {
    let templates = sqlx::query_as::<_, MessageTemplate>(
        r#"
        SELECT * FROM message_templates
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(templates)
}

/// Update a template's editable fields.
pub async fn update_template(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    content: &str,
    category: Option<&str>,
    variables: Vec<String>,
    is_active: bool,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE message_templates
        SET name = ?, content = ?, category = ?, variables = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(content)
    .bind(category)
    .bind(Json(variables))
    .bind(is_active)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "MessageTemplate",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Delete a template by ID.
pub async fn delete_template(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM message_templates WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "MessageTemplate",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Count a user's active templates.
pub async fn count_active_templates(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM message_templates
        WHERE user_id = ? AND is_active = 1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Count active templates grouped by category, most numerous first.
/// Uncategorized templates are reported under "uncategorized".
pub async fn count_by_category(pool: &SqlitePool, user_id: &str) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT COALESCE(category, 'uncategorized') AS category, COUNT(*) AS count
        FROM message_templates
        WHERE user_id = ? AND is_active = 1
        GROUP BY COALESCE(category, 'uncategorized')
        ORDER BY count DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
