//! Database models for the admin audit log.

use crate::types::{AdminLogId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct AdminLogCreateDBRequest {
    pub admin_id: UserId,
    pub action: String,
}

#[derive(Debug, Clone)]
pub struct AdminLogUpdateDBRequest {
    pub action: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminLogDBResponse {
    pub id: AdminLogId,
    pub admin_id: UserId,
    pub action: String,
    pub created_at: DateTime<Utc>,
}
