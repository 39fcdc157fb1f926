//! API request/response models for the admin audit log.

use crate::db::models::admin_logs::AdminLogDBResponse;
use crate::types::{AdminLogId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub admin_id: Option<UserId>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AdminLogUpdate {
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AdminLogId,
    #[schema(value_type = String, format = "uuid")]
    pub admin_id: UserId,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

impl From<AdminLogDBResponse> for AdminLogResponse {
    fn from(db: AdminLogDBResponse) -> Self {
        Self {
            id: db.id,
            admin_id: db.admin_id,
            action: db.action,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogEnvelope {
    pub message: String,
    pub admin_log: AdminLogResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogListEnvelope {
    pub message: String,
    pub admin_logs: Vec<AdminLogResponse>,
}
