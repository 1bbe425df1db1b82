//! Database models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::status::{
    DeliveryStatus, PaymentStatus, PayoutStatus, ScheduleStatus, ServiceRequestStatus,
    SubscriptionStatus, TaskStatus, UserRole,
};

/// A customer contact owned by one messaging user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: String,
    /// Owning user.
    pub user_id: String,
    pub name: String,
    pub phone_number: String,
    /// Optional segment label (e.g., "VIP").
    pub segment: Option<String>,
    /// Last time a broadcast reached this customer.
    pub last_message_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new customer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone_number: String,
    pub segment: Option<String>,
}

/// A named customer group with a color tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CustomerGroup {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join row between a group and a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GroupMembership {
    pub id: String,
    pub group_id: String,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
}

/// A reusable message template with `{placeholder}` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MessageTemplate {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub content: String,
    pub category: Option<String>,
    pub variables: Json<Vec<String>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A broadcast recorded for future delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScheduledMessage {
    pub id: String,
    pub user_id: String,
    pub message_title: String,
    pub message_body: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub customer_ids: Json<Vec<String>>,
    /// Denormalized recipient count; equals `customer_ids.len()` at creation.
    pub customer_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An append-only record of a sent broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MessageHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub message_title: Option<String>,
    pub message_body: Option<String>,
    /// Legacy free-text body kept for rows imported from older data.
    pub message_text: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub customer_count: i64,
}

/// Per-recipient delivery record for one broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MessageLog {
    pub id: String,
    pub user_id: String,
    pub message_id: String,
    pub customer_id: String,
    pub phone_number: String,
    pub delivery_status: DeliveryStatus,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A citizen service request submitted by a client (or anonymously).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ServiceRequest {
    pub id: String,
    /// Submitting client, when authenticated.
    pub client_id: Option<String>,
    pub full_name: String,
    pub phone_number: String,
    pub service_type: String,
    pub document_details: Option<String>,
    pub notes: Option<String>,
    pub file_urls: Json<Vec<String>>,
    pub status: ServiceRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new service request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewServiceRequest {
    pub full_name: String,
    pub phone_number: String,
    pub service_type: String,
    pub document_details: Option<String>,
    pub notes: Option<String>,
    pub file_urls: Vec<String>,
}

/// An internal work item assigned to an agent for a commission split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub admin_id: Option<String>,
    pub agent_id: Option<String>,
    pub client_name: String,
    pub service_type: String,
    pub price: f64,
    /// Commission percentage.
    pub commission_rate: f64,
    /// Commission snapshotted when the task leaves the agent's hands.
    /// `None` for rows that predate snapshotting.
    pub commission_amount: Option<f64>,
    pub status: TaskStatus,
    pub service_request_id: Option<String>,
    pub result_file_url: Option<String>,
    pub agent_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Effective commission: the snapshot if one was taken, otherwise the
    /// live derivation from price and rate.
    pub fn commission(&self) -> f64 {
        self.commission_amount
            .unwrap_or(self.price * self.commission_rate / 100.0)
    }
}

/// Fields for a new task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub admin_id: Option<String>,
    pub agent_id: Option<String>,
    pub client_name: String,
    pub service_type: String,
    pub price: f64,
    pub commission_rate: f64,
    pub status: TaskStatus,
    pub service_request_id: Option<String>,
}

/// A persisted weekly commission settlement for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AgentPayout {
    pub id: String,
    pub agent_id: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub tasks_completed: i64,
    pub total_commission: f64,
    pub status: PayoutStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A messaging plan subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_type: String,
    pub status: SubscriptionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub price_paid: Option<f64>,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A mobile-money (or similar) payment attempt for a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PaymentTransaction {
    pub id: String,
    pub user_id: String,
    pub subscription_id: Option<String>,
    pub payment_method: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub phone_number: Option<String>,
    pub reference_number: Option<String>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-user settings, including the role flag that gates service-desk views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserPreference {
    pub id: String,
    pub user_id: String,
    pub language: String,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub timezone: String,
    pub date_format: String,
    pub user_role: Option<UserRole>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
