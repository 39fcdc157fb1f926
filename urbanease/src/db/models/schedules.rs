//! Database models for service schedules (refuse collection rounds and similar).

use crate::api::models::schedules::ScheduleStatus;
use crate::types::ScheduleId;
use chrono::{DateTime, Utc};

/// Used for both create and update: every field is required and overwritten.
#[derive(Debug, Clone)]
pub struct ScheduleDBRequest {
    pub service: String,
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub frequency: String,
    pub status: ScheduleStatus,
    pub description: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleDBResponse {
    pub id: ScheduleId,
    pub service: String,
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub frequency: String,
    pub status: ScheduleStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
