//! Status-driven workflows for Tuma.
//!
//! This crate owns the rules the persistence layer can't express on its own:
//! which status transitions are legal, who may trigger them, what gets
//! snapshotted when, and how multi-step operations stay consistent. The UI
//! (out of scope here) calls these functions and renders whatever they
//! return; no business rule lives anywhere else.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//! use workflow::{messaging, session::Session, OutgoingMessage};
//! use transport::NullTransport;
//!
//! # async fn example() -> workflow::Result<()> {
//! let db = Database::connect("sqlite:tuma.db?mode=rwc").await?;
//! let session = Session::new("user-1", None);
//!
//! let outcome = messaging::send_now(
//!     db.pool(),
//!     &NullTransport::new(),
//!     &session,
//!     &OutgoingMessage {
//!         title: "Opening hours".to_string(),
//!         body: "Hello {name}, we open at 8am tomorrow.".to_string(),
//!         customer_ids: vec!["customer-1".to_string()],
//!     },
//! )
//! .await?;
//! println!("accepted for {} customers", outcome.sent);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod messaging;
pub mod payout;
pub mod service_request;
pub mod session;
pub mod subscription;
pub mod task;
pub mod template;

pub use error::{Result, WorkflowError};
pub use messaging::{OutgoingMessage, SendOutcome};
pub use payout::{PayoutSummary, WeekWindow};
pub use service_request::TaskSpec;
pub use session::{Action, Session};
