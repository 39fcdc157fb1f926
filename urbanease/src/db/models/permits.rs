//! Database models for permit applications.

use crate::api::models::permits::PermitStatus;
use crate::types::{PermitId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct PermitCreateDBRequest {
    pub user_id: UserId,
    pub permit_type: String,
    pub description: String,
    pub location: String,
    pub submission_date: DateTime<Utc>,
    pub status: PermitStatus,
}

#[derive(Debug, Clone)]
pub struct PermitUpdateDBRequest {
    pub permit_type: String,
    pub description: String,
    pub location: String,
    pub submission_date: DateTime<Utc>,
    pub status: PermitStatus,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PermitDBResponse {
    pub id: PermitId,
    pub user_id: UserId,
    pub permit_type: String,
    pub description: String,
    pub location: String,
    pub submission_date: DateTime<Utc>,
    pub status: PermitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PermitFilter {
    pub user_id: Option<UserId>,
}
