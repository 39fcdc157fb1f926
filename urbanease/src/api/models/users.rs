//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::{UserId, closed_enum};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

closed_enum! {
    /// What an account may do on the platform
    pub enum Role as "user_role" {
        Admin => "ADMIN",
        MunicipalStaff => "MUNICIPAL_STAFF",
        Resident => "RESIDENT",
    }
}

impl Role {
    /// Staff roles manage other people's records
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::MunicipalStaff)
    }
}

closed_enum! {
    /// Residency class of an account. Bulk billing targets accounts by stand type; `SYSTEM`
    /// accounts (the seeded administrator and the treasury) are never billed.
    pub enum StandType as "stand_type" {
        Residential => "RESIDENTIAL",
        Commercial => "COMMERCIAL",
        Other => "OTHER",
        System => "SYSTEM",
    }
}

// User request models
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub address: Option<String>,
    pub stand_type: Option<StandType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub address: Option<String>,
    pub stand_type: Option<StandType>,
    /// When present the password is re-hashed and replaced
    pub password: Option<String>,
}

/// Body of the legacy `DELETE /api/users/delete` route
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDeleteRequest {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub id: Option<UserId>,
}

// User response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub stand_type: StandType,
    pub auth_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            role: db.role,
            phone: db.phone,
            address: db.address,
            stand_type: db.stand_type,
            auth_source: db.auth_source,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListEnvelope {
    pub message: String,
    pub users: Vec<UserResponse>,
}

/// The authenticated caller, as resolved by the auth extractor on every request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub address: Option<String>,
}

impl CurrentUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.name,
            email: db.email,
            role: db.role,
            address: db.address,
        }
    }
}
