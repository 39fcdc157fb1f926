//! Database models for users.

use crate::api::models::users::{Role, StandType};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub stand_type: StandType,
    pub auth_source: String,
}

/// Database request for updating a user. All mutable fields are overwritten; the password hash
/// only when one is supplied.
#[derive(Debug, Clone)]
pub struct UserUpdateDBRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub stand_type: StandType,
    pub password_hash: Option<String>,
}

/// Database response for a user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub stand_type: StandType,
    pub auth_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Selects the accounts a bulk billing run charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidentFilter {
    /// Every account that is not a system account
    All,
    /// Accounts of exactly this stand type
    StandType(StandType),
}

impl ResidentFilter {
    pub fn matches(&self, stand_type: StandType) -> bool {
        match self {
            ResidentFilter::All => stand_type != StandType::System,
            ResidentFilter::StandType(wanted) => *wanted == stand_type,
        }
    }
}

impl fmt::Display for ResidentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResidentFilter::All => f.write_str("ALL"),
            ResidentFilter::StandType(stand_type) => write!(f, "{stand_type}"),
        }
    }
}

impl FromStr for ResidentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ResidentFilter::All);
        }
        s.parse().map(ResidentFilter::StandType)
    }
}

impl Serialize for ResidentFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResidentFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Filter for listing users. Results are always ordered by creation time, then id.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub residents: Option<ResidentFilter>,
}

impl UserFilter {
    pub fn residents(filter: ResidentFilter) -> Self {
        Self { residents: Some(filter) }
    }
}
