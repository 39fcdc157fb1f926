//! Database layer for data persistence and access.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │    Store    │  (db::store - Arc<dyn Store>, Postgres or in-memory)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries, one per table)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`store`]: the [`Store`] trait and its Postgres and in-memory implementations
//! - [`handlers`]: Postgres repositories implementing the `Repository` trait
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Transactions
//!
//! Repositories run on whatever connection they are given. Operations that must be atomic,
//! such as posting the legs of a ledger transaction, open a transaction themselves:
//!
//! ```ignore
//! let mut conn = pool.acquire().await?;
//! let posted = Payments::new(&mut conn).post(&posting).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
pub mod store;

pub use store::{InMemoryStore, PgStore, Store};
