//! Session context and role-based authorization.
//!
//! The session is an explicit value passed into every workflow operation,
//! not ambient global state. Authorization is evaluated here, next to the
//! writes it gates, instead of trusting a client-held role flag.

use database::UserRole;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// An authenticated (or anonymous) caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Option<UserRole>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            role,
        }
    }

    /// Convenience constructor for an admin session.
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Some(UserRole::Admin))
    }

    /// Convenience constructor for an agent session.
    pub fn agent(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Some(UserRole::Agent))
    }

    /// Convenience constructor for a client session.
    pub fn client(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Some(UserRole::Client))
    }

    /// Whether this session may perform `action`.
    pub fn can(&self, action: Action) -> bool {
        use Action::*;

        match self.role {
            Some(UserRole::Admin) => true,
            Some(UserRole::Agent) => matches!(action, SubmitWork | MarkTaskDone | SubmitRequest),
            Some(UserRole::Client) => matches!(
                action,
                SubmitRequest | SendMessage | ManageCustomers | ManageSubscription
            ),
            // No role: an ordinary messaging user. They own their contacts
            // and broadcasts, and may submit a service request.
            None => matches!(
                action,
                SubmitRequest | SendMessage | ManageCustomers | ManageSubscription
            ),
        }
    }

    /// Fail with [`WorkflowError::Unauthorized`] unless `action` is allowed.
    pub fn authorize(&self, action: Action) -> Result<()> {
        if self.can(action) {
            return Ok(());
        }

        let role = self
            .role
            .map(|r| r.as_str().to_string())
            .unwrap_or_else(|| "none".to_string());
        tracing::warn!(user_id = %self.user_id, role = %role, action = %action.as_str(), "unauthorized");

        Err(WorkflowError::Unauthorized {
            role,
            action: action.as_str(),
        })
    }
}

/// Privileged actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SubmitRequest,
    ApproveRequest,
    RejectRequest,
    ConvertRequest,
    SubmitWork,
    MarkTaskDone,
    ReviewTask,
    CancelTask,
    MarkPayoutPaid,
    SendMessage,
    ManageCustomers,
    ManageSubscription,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitRequest => "submit a service request",
            Self::ApproveRequest => "approve a service request",
            Self::RejectRequest => "reject a service request",
            Self::ConvertRequest => "convert a request into a task",
            Self::SubmitWork => "submit work for review",
            Self::MarkTaskDone => "mark a task done",
            Self::ReviewTask => "review a task",
            Self::CancelTask => "cancel a task",
            Self::MarkPayoutPaid => "mark a payout paid",
            Self::SendMessage => "send messages",
            Self::ManageCustomers => "manage customers",
            Self::ManageSubscription => "manage a subscription",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_can_everything() {
        let session = Session::admin("admin-1");
        assert!(session.can(Action::ApproveRequest));
        assert!(session.can(Action::MarkPayoutPaid));
        assert!(session.can(Action::SubmitWork));
    }

    #[test]
    fn test_agent_is_limited_to_task_work() {
        let session = Session::agent("agent-1");
        assert!(session.can(Action::SubmitWork));
        assert!(session.can(Action::MarkTaskDone));
        assert!(!session.can(Action::ApproveRequest));
        assert!(!session.can(Action::MarkPayoutPaid));
        assert!(!session.can(Action::ReviewTask));
    }

    #[test]
    fn test_client_cannot_touch_workflow_admin_side() {
        let session = Session::client("client-1");
        assert!(session.can(Action::SubmitRequest));
        assert!(session.can(Action::SendMessage));
        assert!(!session.can(Action::ConvertRequest));
        assert!(!session.can(Action::ReviewTask));
    }

    #[test]
    fn test_authorize_reports_role_and_action() {
        let session = Session::agent("agent-1");
        let err = session.authorize(Action::MarkPayoutPaid).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("agent"));
        assert!(msg.contains("payout"));
    }
}
