//! Status enums for workflow-bearing entities.
//!
//! Every status column is TEXT in SQLite backed by a closed enum here, so an
//! out-of-vocabulary status string fails at decode time instead of leaking
//! into workflow logic.

use serde::{Deserialize, Serialize};

/// Lifecycle of a citizen service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ServiceRequestStatus {
    Pending,
    Approved,
    InProgress,
    Completed,
    Cancelled,
    ConvertedToTask,
}

impl ServiceRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::ConvertedToTask => "converted_to_task",
        }
    }
}

/// Lifecycle of an agent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Approved,
    SubmittedForReview,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::SubmittedForReview => "submitted_for_review",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Lifecycle of a scheduled broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Sent,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Settlement state of a weekly payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Paid,
}

/// Subscription activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Inactive,
    Active,
}

/// Payment transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

/// Per-recipient delivery state of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

/// Role attached to a user's preferences. Absence means an ordinary
/// messaging user with no service-desk privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Agent,
    Client,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
            Self::Client => "client",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_are_snake_case() {
        assert_eq!(ServiceRequestStatus::ConvertedToTask.as_str(), "converted_to_task");
        assert_eq!(TaskStatus::SubmittedForReview.as_str(), "submitted_for_review");
        assert_eq!(ScheduleStatus::Scheduled.as_str(), "scheduled");
        assert_eq!(UserRole::Agent.as_str(), "agent");
    }
}
