//! Error types for workflow operations.

use database::{DatabaseError, ValidationError};
use thiserror::Error;
use transport::TransportError;

/// Errors that can occur while driving a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Underlying store operation failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Delivery channel failed outright.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The entity is not in a state from which this transition is legal.
    #[error("illegal {entity} transition: {from} -> {to}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: &'static str,
    },

    /// The session's role does not permit this action.
    #[error("role {role} is not allowed to {action}")]
    Unauthorized { role: String, action: &'static str },

    /// Required input was missing or malformed; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// This agent was already settled for the week.
    #[error("agent {agent_id} already has a paid payout for week starting {week_start}")]
    AlreadyPaid { agent_id: String, week_start: String },
}

impl From<ValidationError> for WorkflowError {
    fn from(e: ValidationError) -> Self {
        WorkflowError::Validation(e.to_string())
    }
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;
