//! SQLite persistence layer for Tuma.
//!
//! This crate provides async database operations for customers, messaging
//! history, service requests, agent tasks, payouts, subscriptions, and user
//! preferences using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, customer, models::NewCustomer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:tuma.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let new = NewCustomer {
//!         name: "Jane Smith".to_string(),
//!         phone_number: "+250788000000".to_string(),
//!         segment: Some("VIP".to_string()),
//!     };
//!     customer::create_customer(db.pool(), "user-1", &new).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod changes;
pub mod customer;
pub mod error;
pub mod group;
pub mod message_history;
pub mod models;
pub mod payment;
pub mod payout;
pub mod preference;
pub mod scheduled_message;
pub mod service_request;
pub mod status;
pub mod subscription;
pub mod task;
pub mod template;
pub mod validation;

pub use changes::{ChangeFeed, ChangeOp, TableChange};
pub use error::{DatabaseError, Result};
pub use models::{
    AgentPayout, Customer, CustomerGroup, GroupMembership, MessageHistoryEntry, MessageLog,
    MessageTemplate, NewCustomer, NewServiceRequest, NewTask, PaymentTransaction,
    ScheduledMessage, ServiceRequest, Subscription, Task, UserPreference,
};
pub use status::{
    DeliveryStatus, PaymentStatus, PayoutStatus, ScheduleStatus, ServiceRequestStatus,
    SubscriptionStatus, TaskStatus, UserRole,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist, or
    /// `sqlite::memory:` for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up
    /// to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
