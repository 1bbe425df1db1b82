//! User preference storage, including the role flag.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::UserPreference;
use crate::status::UserRole;

/// Get a user's preferences, creating the defaults on first read.
pub async fn get_or_create(pool: &SqlitePool, user_id: &str) -> Result<UserPreference> {
    if let Some(preference) =
        sqlx::query_as::<_, UserPreference>("SELECT * FROM user_preferences WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
    {
        return Ok(preference);
    }

    let now = Utc::now();
    let preference = UserPreference {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        language: "en".to_string(),
        email_notifications: true,
        sms_notifications: true,
        timezone: "Africa/Kigali".to_string(),
        date_format: "DD/MM/YYYY".to_string(),
        user_role: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO user_preferences
            (id, user_id, language, email_notifications, sms_notifications, timezone, date_format, user_role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&preference.id)
    .bind(&preference.user_id)
    .bind(&preference.language)
    .bind(preference.email_notifications)
    .bind(preference.sms_notifications)
    .bind(&preference.timezone)
    .bind(&preference.date_format)
    .bind(preference.user_role)
    .bind(preference.created_at)
    .bind(preference.updated_at)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, "created default preferences");
    Ok(preference)
}

/// Update a user's preference fields.
pub async fn update(pool: &SqlitePool, preference: &UserPreference) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE user_preferences
        SET language = ?, email_notifications = ?, sms_notifications = ?,
            timezone = ?, date_format = ?, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(&preference.language)
    .bind(preference.email_notifications)
    .bind(preference.sms_notifications)
    .bind(&preference.timezone)
    .bind(&preference.date_format)
    .bind(Utc::now())
    .bind(&preference.user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "UserPreference",
            id: preference.user_id.clone(),
        });
    }

    Ok(())
}

/// Set (or clear) a user's role.
pub async fn set_role(pool: &SqlitePool, user_id: &str, role: Option<UserRole>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE user_preferences SET user_role = ?, updated_at = ? WHERE user_id = ?
        "#,
    )
    .bind(role)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "UserPreference",
            id: user_id.to_string(),
        });
    }

    Ok(())
}

/// Look up a user's role, if preferences exist and a role is set.
pub async fn get_role(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRole>> {
    let role = sqlx::query_scalar::<_, Option<UserRole>>(
        "SELECT user_role FROM user_preferences WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(role.flatten())
}
