//! Service request lifecycle.
//!
//! ```text
//! pending  --approve-->      approved
//! pending  --reject-->       cancelled
//! approved --reject-->       cancelled
//! approved --create_task-->  converted_to_task   (spawns a Task atomically)
//! ```
//!
//! Every transition checks the current status and uses a guarded write
//! underneath, so a concurrent admin clicking the same button loses cleanly
//! instead of silently double-applying.

use database::service_request as repo;
use database::{
    validation, ChangeFeed, DatabaseError, NewServiceRequest, NewTask, ServiceRequest,
    ServiceRequestStatus, Task, TaskStatus,
};
use sqlx::SqlitePool;

use crate::error::{Result, WorkflowError};
use crate::session::{Action, Session};

/// Default commission split for tasks spawned from a request, in percent.
pub const DEFAULT_COMMISSION_RATE: f64 = 50.0;

/// Admin-supplied fields when converting a request into a task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub title: String,
    pub description: Option<String>,
    pub agent_id: String,
    pub price: f64,
    pub commission_rate: f64,
}

/// Submit a new service request.
///
/// `session` is optional: unauthenticated submissions are allowed and simply
/// carry no client id. Required fields are validated before any store call.
pub async fn submit(
    pool: &SqlitePool,
    feed: Option<&ChangeFeed>,
    session: Option<&Session>,
    new: &NewServiceRequest,
) -> Result<ServiceRequest> {
    if let Some(session) = session {
        session.authorize(Action::SubmitRequest)?;
    }

    validation::validate_name(&new.full_name)?;
    validation::validate_phone(&new.phone_number)?;
    if new.service_type.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "service type is required".to_string(),
        ));
    }

    let client_id = session.map(|s| s.user_id.as_str());
    let request = repo::create_request(pool, feed, client_id, new).await?;

    tracing::info!(request_id = %request.id, service_type = %request.service_type, "service request submitted");
    Ok(request)
}

/// Approve a pending request.
pub async fn approve(
    pool: &SqlitePool,
    feed: Option<&ChangeFeed>,
    session: &Session,
    request_id: &str,
) -> Result<()> {
    session.authorize(Action::ApproveRequest)?;
    transition(pool, feed, request_id, ServiceRequestStatus::Approved).await
}

/// Reject a pending or approved request.
pub async fn reject(
    pool: &SqlitePool,
    feed: Option<&ChangeFeed>,
    session: &Session,
    request_id: &str,
) -> Result<()> {
    session.authorize(Action::RejectRequest)?;
    transition(pool, feed, request_id, ServiceRequestStatus::Cancelled).await
}

/// Convert an approved request into an agent task.
///
/// The task insert and the status flip to `converted_to_task` happen in one
/// transaction: a failure at any point leaves neither write visible.
pub async fn create_task_from_request(
    pool: &SqlitePool,
    feed: Option<&ChangeFeed>,
    session: &Session,
    request_id: &str,
    spec: &TaskSpec,
) -> Result<Task> {
    session.authorize(Action::ConvertRequest)?;

    if spec.title.trim().is_empty() || spec.agent_id.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "task title and agent are required".to_string(),
        ));
    }
    if spec.price <= 0.0 {
        return Err(WorkflowError::Validation(
            "task price must be positive".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&spec.commission_rate) {
        return Err(WorkflowError::Validation(
            "commission rate must be between 0 and 100".to_string(),
        ));
    }

    let request = repo::get_request(pool, request_id).await?;
    if request.status != ServiceRequestStatus::Approved {
        return Err(WorkflowError::IllegalTransition {
            entity: "ServiceRequest",
            from: request.status.as_str().to_string(),
            to: ServiceRequestStatus::ConvertedToTask.as_str(),
        });
    }

    let new_task = NewTask {
        title: spec.title.clone(),
        description: spec.description.clone(),
        admin_id: Some(session.user_id.clone()),
        agent_id: Some(spec.agent_id.clone()),
        client_name: request.full_name.clone(),
        service_type: request.service_type.clone(),
        price: spec.price,
        commission_rate: spec.commission_rate,
        // Spawned tasks skip `pending`: the admin already vetted the request.
        status: TaskStatus::Approved,
        service_request_id: None,
    };

    let task = repo::convert_to_task(pool, feed, request_id, &new_task)
        .await
        .map_err(map_conflict(ServiceRequestStatus::ConvertedToTask))?;

    tracing::info!(
        request_id = %request_id,
        task_id = %task.id,
        agent_id = %spec.agent_id,
        "request converted to task"
    );
    Ok(task)
}

/// Shared guarded transition: only `pending` requests may be approved, and
/// only `pending`/`approved` may be cancelled.
async fn transition(
    pool: &SqlitePool,
    feed: Option<&ChangeFeed>,
    request_id: &str,
    to: ServiceRequestStatus,
) -> Result<()> {
    let request = repo::get_request(pool, request_id).await?;

    let legal = match (request.status, to) {
        (ServiceRequestStatus::Pending, ServiceRequestStatus::Approved) => true,
        (ServiceRequestStatus::Pending, ServiceRequestStatus::Cancelled) => true,
        (ServiceRequestStatus::Approved, ServiceRequestStatus::Cancelled) => true,
        _ => false,
    };
    if !legal {
        return Err(WorkflowError::IllegalTransition {
            entity: "ServiceRequest",
            from: request.status.as_str().to_string(),
            to: to.as_str(),
        });
    }

    repo::transition_status(pool, feed, request_id, request.status, to)
        .await
        .map_err(map_conflict(to))?;

    tracing::info!(request_id = %request_id, from = %request.status.as_str(), to = %to.as_str(), "service request transition");
    Ok(())
}

/// A `StatusConflict` out of a guarded write means we raced another session;
/// report it as an illegal transition rather than a bare store error.
fn map_conflict(to: ServiceRequestStatus) -> impl Fn(DatabaseError) -> WorkflowError {
    move |e| match e {
        DatabaseError::StatusConflict { .. } => WorkflowError::IllegalTransition {
            entity: "ServiceRequest",
            from: "(changed concurrently)".to_string(),
            to: to.as_str(),
        },
        other => WorkflowError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn new_request() -> NewServiceRequest {
        NewServiceRequest {
            full_name: "John Doe".to_string(),
            phone_number: "+250788000000".to_string(),
            service_type: "passport".to_string(),
            document_details: Some("renewal".to_string()),
            notes: None,
            file_urls: vec![],
        }
    }

    fn spec() -> TaskSpec {
        TaskSpec {
            title: "Process passport renewal".to_string(),
            description: None,
            agent_id: "agent-1".to_string(),
            price: 20_000.0,
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }

    #[tokio::test]
    async fn test_submit_requires_mandatory_fields() {
        let db = test_db().await;

        let mut bad = new_request();
        bad.full_name = " ".to_string();
        let result = submit(db.pool(), None, None, &bad).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let mut bad = new_request();
        bad.service_type = "".to_string();
        let result = submit(db.pool(), None, None, &bad).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        // Nothing was written.
        let requests = repo::list_requests(db.pool()).await.unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_submission_has_no_client_id() {
        let db = test_db().await;

        let request = submit(db.pool(), None, None, &new_request()).await.unwrap();
        assert!(request.client_id.is_none());
        assert_eq!(request.status, ServiceRequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_approve_only_from_pending() {
        let db = test_db().await;
        let admin = Session::admin("admin-1");

        let request = submit(db.pool(), None, None, &new_request()).await.unwrap();

        approve(db.pool(), None, &admin, &request.id).await.unwrap();
        let fetched = repo::get_request(db.pool(), &request.id).await.unwrap();
        assert_eq!(fetched.status, ServiceRequestStatus::Approved);

        // Approving again is illegal.
        let result = approve(db.pool(), None, &admin, &request.id).await;
        assert!(matches!(result, Err(WorkflowError::IllegalTransition { .. })));
    }

    #[tokio::test]
    async fn test_reject_from_pending_and_approved() {
        let db = test_db().await;
        let admin = Session::admin("admin-1");

        let a = submit(db.pool(), None, None, &new_request()).await.unwrap();
        reject(db.pool(), None, &admin, &a.id).await.unwrap();
        assert_eq!(
            repo::get_request(db.pool(), &a.id).await.unwrap().status,
            ServiceRequestStatus::Cancelled
        );

        let b = submit(db.pool(), None, None, &new_request()).await.unwrap();
        approve(db.pool(), None, &admin, &b.id).await.unwrap();
        reject(db.pool(), None, &admin, &b.id).await.unwrap();

        // Rejecting a cancelled request is illegal.
        let result = reject(db.pool(), None, &admin, &b.id).await;
        assert!(matches!(result, Err(WorkflowError::IllegalTransition { .. })));
    }

    #[tokio::test]
    async fn test_agent_cannot_approve() {
        let db = test_db().await;
        let agent = Session::agent("agent-1");

        let request = submit(db.pool(), None, None, &new_request()).await.unwrap();
        let result = approve(db.pool(), None, &agent, &request.id).await;
        assert!(matches!(result, Err(WorkflowError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_create_task_requires_approved_request() {
        let db = test_db().await;
        let admin = Session::admin("admin-1");

        let request = submit(db.pool(), None, None, &new_request()).await.unwrap();

        let result =
            create_task_from_request(db.pool(), None, &admin, &request.id, &spec()).await;
        assert!(matches!(result, Err(WorkflowError::IllegalTransition { .. })));

        approve(db.pool(), None, &admin, &request.id).await.unwrap();
        let task = create_task_from_request(db.pool(), None, &admin, &request.id, &spec())
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Approved);
        assert_eq!(task.client_name, "John Doe");
        assert_eq!(task.service_type, "passport");
        assert_eq!(task.admin_id.as_deref(), Some("admin-1"));
        assert_eq!(task.agent_id.as_deref(), Some("agent-1"));
        assert_eq!(task.service_request_id.as_deref(), Some(request.id.as_str()));

        let fetched = repo::get_request(db.pool(), &request.id).await.unwrap();
        assert_eq!(fetched.status, ServiceRequestStatus::ConvertedToTask);

        // Converting twice is illegal and spawns no second task.
        let result =
            create_task_from_request(db.pool(), None, &admin, &request.id, &spec()).await;
        assert!(matches!(result, Err(WorkflowError::IllegalTransition { .. })));
    }

    #[tokio::test]
    async fn test_mutations_publish_to_change_feed() {
        let db = test_db().await;
        let admin = Session::admin("admin-1");
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();

        let request = submit(db.pool(), Some(&feed), None, &new_request())
            .await
            .unwrap();
        approve(db.pool(), Some(&feed), &admin, &request.id).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.op, database::ChangeOp::Insert);
        assert_eq!(first.row_id, request.id);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.op, database::ChangeOp::Update);
    }
}
