//! Database models for resident notifications.

use crate::api::models::notifications::NotificationStatus;
use crate::types::{NotificationId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct NotificationCreateDBRequest {
    pub user_id: UserId,
    pub message: String,
    pub status: NotificationStatus,
}

#[derive(Debug, Clone)]
pub struct NotificationUpdateDBRequest {
    pub message: String,
    pub status: NotificationStatus,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationDBResponse {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_id: Option<UserId>,
}
