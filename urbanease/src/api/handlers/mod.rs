//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authorization checks against the caller's role
//! - Business logic execution via the store or the ledger
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Sign-up, login, logout and the current session
//! - [`users`]: User CRUD operations
//! - [`bills`]: Bill CRUD operations and bulk billing
//! - [`payments`]: Manual ledger legs, single payments and account statements
//! - [`permits`]: Permit applications
//! - [`tickets`]: Service requests
//! - [`schedules`]: Service schedules
//! - [`notifications`]: Resident notifications
//! - [`admin_logs`]: The administrative audit log
//!
//! # Authentication
//!
//! Handlers take a [`CurrentUser`](crate::api::models::users::CurrentUser) argument, which
//! rejects unauthenticated requests with 401. Staff-only operations call
//! [`require_staff`](crate::auth::current_user::require_staff), which rejects with 403.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error responses.

pub mod admin_logs;
pub mod auth;
pub mod bills;
pub mod notifications;
pub mod payments;
pub mod permits;
pub mod schedules;
pub mod tickets;
pub mod users;
