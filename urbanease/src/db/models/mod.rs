//! Database record models matching table schemas.
//!
//! These structs are what the repositories accept and return. Response types derive
//! `sqlx::FromRow` and are also the row type of the in-memory store, so both backends hand
//! handlers identical values.
//!
//! # Model Categories
//!
//! - [`users`]: accounts, roles and the resident filter used by bulk billing
//! - [`bills`]: bills owed by residents
//! - [`payments`]: ledger legs and the posting plan used to write them atomically
//! - [`permits`], [`tickets`], [`schedules`], [`notifications`], [`admin_logs`]: the
//!   remaining municipal resources
//! - [`sequences`]: human readable identifiers (`BIL-001`, `PYM-001`, `TKT-001`)
//!
//! API models convert from these with `From`:
//!
//! ```ignore
//! use urbanease::api::models::bills::BillResponse;
//!
//! let response: BillResponse = db_bill.into();
//! ```

pub mod admin_logs;
pub mod bills;
pub mod notifications;
pub mod payments;
pub mod permits;
pub mod schedules;
pub mod sequences;
pub mod tickets;
pub mod users;
