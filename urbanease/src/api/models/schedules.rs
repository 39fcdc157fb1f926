//! API request/response models for service schedules.
//!
//! Schedules keep the capitalised JSON keys (`Service`, `Date_Time`, `Location`,
//! `Frequency`, `Status`) that existing clients send and expect.

use crate::db::models::schedules::ScheduleDBResponse;
use crate::types::{ScheduleId, closed_enum};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

closed_enum! {
    pub enum ScheduleStatus as "schedule_status" {
        Scheduled => "SCHEDULED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

/// Body for both create and update; every field is mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    #[serde(rename = "Service")]
    pub service: Option<String>,
    #[serde(rename = "Date_Time")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Frequency")]
    pub frequency: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<ScheduleStatus>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ScheduleId,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Date_Time")]
    pub date_time: DateTime<Utc>,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Frequency")]
    pub frequency: String,
    #[serde(rename = "Status")]
    pub status: ScheduleStatus,
    pub description: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<ScheduleDBResponse> for ScheduleResponse {
    fn from(db: ScheduleDBResponse) -> Self {
        Self {
            id: db.id,
            service: db.service,
            date_time: db.date_time,
            location: db.location,
            frequency: db.frequency,
            status: db.status,
            description: db.description,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleEnvelope {
    pub message: String,
    pub schedule: ScheduleResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleListEnvelope {
    pub message: String,
    #[serde(rename = "serviceSchedules")]
    pub schedules: Vec<ScheduleResponse>,
}
