//! Postgres repositories.
//!
//! Each repository wraps a `&mut PgConnection` (a pooled connection or an open transaction)
//! and implements the [`Repository`] trait for one table. Operations that touch several rows
//! open their own transaction on the connection they were given:
//!
//! - [`Payments::post`] writes every leg of a ledger transaction and settles the linked bill
//! - [`Tickets`] allocates the `TKT-` id and inserts the ticket together
//!
//! ```ignore
//! use urbanease::db::handlers::{Bills, Repository};
//!
//! let mut conn = pool.acquire().await?;
//! let bill = Bills::new(&mut conn).get_by_id(bill_id).await?;
//! ```
//!
//! Handlers do not use repositories directly; they go through [`crate::db::Store`], which has
//! a Postgres implementation built on these and an in-memory one for development and tests.

pub mod admin_logs;
pub mod bills;
pub mod notifications;
pub mod payments;
pub mod permits;
pub mod repository;
pub mod schedules;
pub mod sequences;
pub mod tickets;
pub mod users;

pub use admin_logs::AdminLogs;
pub use bills::Bills;
pub use notifications::Notifications;
pub use payments::Payments;
pub use permits::Permits;
pub use repository::Repository;
pub use schedules::Schedules;
pub use sequences::Sequences;
pub use tickets::Tickets;
pub use users::Users;
