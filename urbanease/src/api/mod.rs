//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`extract`]**: JSON, path and query extractors that reject with a JSON error body
//!
//! # API Structure
//!
//! Every route lives under `/api`:
//!
//! - **Authentication** (`/api/auth/*`): Sign-up, login, logout and the current session
//! - **Users** (`/api/users/*`): Account management
//! - **Bills** (`/api/bills/*`): Bills and bulk billing of residents
//! - **Payments** (`/api/payments/*`): Ledger legs, single payments and account statements
//! - **Permits** (`/api/permits/*`): Permit applications
//! - **Service requests** (`/api/service-requests/*`): Resident tickets
//! - **Service schedules** (`/api/service-schedules/*`): Planned municipal services
//! - **Notifications** (`/api/notifications/*`) and **Admin log** (`/api/admin-log/*`)
//!
//! Resources share one route shape: `add`, `all`, `get/{id}`, `update/{id}` and `delete/{id}`.
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`. The document is served
//! at `/api/openapi.json` and rendered at `/docs` when the server is running.

pub mod extract;
pub mod handlers;
pub mod models;
