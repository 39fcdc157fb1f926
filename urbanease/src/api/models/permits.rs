//! API request/response models for permit applications.

use crate::api::models::users::UserResponse;
use crate::db::models::permits::PermitDBResponse;
use crate::types::{PermitId, UserId, closed_enum};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

closed_enum! {
    pub enum PermitStatus as "permit_status" {
        Pending => "PENDING",
        InReview => "IN_REVIEW",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermitCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub permit_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub submission_date: Option<DateTime<Utc>>,
    /// Defaults to `PENDING`
    pub status: Option<PermitStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermitUpdate {
    pub permit_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub submission_date: Option<DateTime<Utc>>,
    pub status: Option<PermitStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermitResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PermitId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub permit_type: String,
    pub description: String,
    pub location: String,
    pub submission_date: DateTime<Utc>,
    pub status: PermitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

impl From<PermitDBResponse> for PermitResponse {
    fn from(db: PermitDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            permit_type: db.permit_type,
            description: db.description,
            location: db.location,
            submission_date: db.submission_date,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
            user: None,
        }
    }
}

impl PermitResponse {
    pub fn with_user(mut self, user: Option<UserResponse>) -> Self {
        self.user = user;
        self
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct PermitsByUserQuery {
    #[param(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermitEnvelope {
    pub message: String,
    pub permit: PermitResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermitListEnvelope {
    pub message: String,
    pub permits: Vec<PermitResponse>,
}
