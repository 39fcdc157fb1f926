//! API request/response models for notifications.

use crate::db::models::notifications::NotificationDBResponse;
use crate::types::{NotificationId, UserId, closed_enum};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

closed_enum! {
    pub enum NotificationStatus as "notification_status" {
        Unread => "UNREAD",
        Read => "READ",
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub message: Option<String>,
    /// Defaults to `UNREAD`
    pub status: Option<NotificationStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NotificationUpdate {
    pub message: Option<String>,
    pub status: Option<NotificationStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NotificationId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationDBResponse> for NotificationResponse {
    fn from(db: NotificationDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            message: db.message,
            status: db.status,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationEnvelope {
    pub message: String,
    pub notification: NotificationResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationListEnvelope {
    pub message: String,
    pub notifications: Vec<NotificationResponse>,
}
