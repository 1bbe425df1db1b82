//! Service request storage, guarded transitions, and transactional
//! conversion into an agent task.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::changes::{ChangeFeed, ChangeOp, TableChange};
use crate::error::{DatabaseError, Result};
use crate::models::{NewServiceRequest, NewTask, ServiceRequest, Task};
use crate::status::ServiceRequestStatus;

const TABLE: &str = "service_requests";

fn publish(feed: Option<&ChangeFeed>, op: ChangeOp, row_id: &str) {
    if let Some(feed) = feed {
        feed.publish(TableChange {
            table: TABLE,
            op,
            row_id: row_id.to_string(),
        });
    }
}

/// Create a new service request in `pending` status.
pub async fn create_request(
    pool: &SqlitePool,
    feed: Option<&ChangeFeed>,
    client_id: Option<&str>,
    new: &NewServiceRequest,
) -> Result<ServiceRequest> {
    let now = Utc::now();
    let request = ServiceRequest {
        id: Uuid::new_v4().to_string(),
        client_id: client_id.map(str::to_string),
        full_name: new.full_name.clone(),
        phone_number: new.phone_number.clone(),
        service_type: new.service_type.clone(),
        document_details: new.document_details.clone(),
        notes: new.notes.clone(),
        file_urls: Json(new.file_urls.clone()),
        status: ServiceRequestStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO service_requests
            (id, client_id, full_name, phone_number, service_type, document_details, notes, file_urls, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&request.id)
    .bind(&request.client_id)
    .bind(&request.full_name)
    .bind(&request.phone_number)
    .bind(&request.service_type)
    .bind(&request.document_details)
    .bind(&request.notes)
    .bind(&request.file_urls)
    .bind(request.status)
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(pool)
    .await?;

    publish(feed, ChangeOp::Insert, &request.id);
    Ok(request)
}

/// Get a request by ID.
pub async fn get_request(pool: &SqlitePool, id: &str) -> Result<ServiceRequest> {
    sqlx::query_as::<_, ServiceRequest>("SELECT * FROM service_requests WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "ServiceRequest",
            id: id.to_string(),
        })
}

/// List every request, newest first (the admin queue).
pub async fn list_requests(pool: &SqlitePool) -> Result<Vec<ServiceRequest>> {
    let requests = sqlx::query_as::<_, ServiceRequest>(
        r#"
        SELECT * FROM service_requests
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(requests)
}

/// List requests submitted by one client, newest first.
pub async fn list_requests_for_client(
    pool: &SqlitePool,
    client_id: &str,
) -> Result<Vec<ServiceRequest>> {
    let requests = sqlx::query_as::<_, ServiceRequest>(
        r#"
        SELECT * FROM service_requests
        WHERE client_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;

    Ok(requests)
}

/// Move a request from `from` to `to`, failing if the row isn't currently in
/// `from`. Distinguishes a missing row (`NotFound`) from a raced or illegal
/// write (`StatusConflict`).
pub async fn transition_status(
    pool: &SqlitePool,
    feed: Option<&ChangeFeed>,
    id: &str,
    from: ServiceRequestStatus,
    to: ServiceRequestStatus,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE service_requests
        SET status = ?, updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to)
    .bind(Utc::now())
    .bind(id)
    .bind(from)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM service_requests WHERE id = ?")
                .bind(id)
                .fetch_one(pool)
                .await?;

        if exists == 0 {
            return Err(DatabaseError::NotFound {
                entity: "ServiceRequest",
                id: id.to_string(),
            });
        }
        return Err(DatabaseError::StatusConflict {
            entity: "ServiceRequest",
            id: id.to_string(),
            expected: from.as_str(),
        });
    }

    publish(feed, ChangeOp::Update, id);
    Ok(())
}

/// Convert an approved request into a task inside one transaction: the task
/// insert and the status flip to `converted_to_task` commit together or not
/// at all.
pub async fn convert_to_task(
    pool: &SqlitePool,
    feed: Option<&ChangeFeed>,
    request_id: &str,
    new: &NewTask,
) -> Result<Task> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let task = Task {
        id: Uuid::new_v4().to_string(),
        title: new.title.clone(),
        description: new.description.clone(),
        admin_id: new.admin_id.clone(),
        agent_id: new.agent_id.clone(),
        client_name: new.client_name.clone(),
        service_type: new.service_type.clone(),
        price: new.price,
        commission_rate: new.commission_rate,
        commission_amount: None,
        status: new.status,
        service_request_id: Some(request_id.to_string()),
        result_file_url: None,
        agent_notes: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO tasks
            (id, title, description, admin_id, agent_id, client_name, service_type, price,
             commission_rate, status, service_request_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.admin_id)
    .bind(&task.agent_id)
    .bind(&task.client_name)
    .bind(&task.service_type)
    .bind(task.price)
    .bind(task.commission_rate)
    .bind(task.status)
    .bind(&task.service_request_id)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query(
        r#"
        UPDATE service_requests
        SET status = ?, updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(ServiceRequestStatus::ConvertedToTask)
    .bind(now)
    .bind(request_id)
    .bind(ServiceRequestStatus::Approved)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        // Dropping the transaction rolls back the task insert.
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM service_requests WHERE id = ?")
                .bind(request_id)
                .fetch_one(&mut *tx)
                .await?;

        if exists == 0 {
            return Err(DatabaseError::NotFound {
                entity: "ServiceRequest",
                id: request_id.to_string(),
            });
        }
        return Err(DatabaseError::StatusConflict {
            entity: "ServiceRequest",
            id: request_id.to_string(),
            expected: ServiceRequestStatus::Approved.as_str(),
        });
    }

    tx.commit().await?;
    publish(feed, ChangeOp::Update, request_id);
    Ok(task)
}
