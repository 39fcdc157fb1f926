//! API request/response models for service requests (tickets).

use crate::db::models::tickets::TicketDBResponse;
use crate::types::{TicketId, UserId, closed_enum};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

closed_enum! {
    pub enum TicketPriority as "ticket_priority" {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Urgent => "URGENT",
    }
}

closed_enum! {
    pub enum TicketStatus as "ticket_status" {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Resolved => "RESOLVED",
        Closed => "CLOSED",
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    /// Kind of request, e.g. "Burst pipe". Older clients send it as `category`.
    #[serde(rename = "type", alias = "category")]
    pub ticket_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Defaults to `MEDIUM`
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<String>,
    /// Defaults to `OPEN`
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    #[serde(rename = "type", alias = "category")]
    pub ticket_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<String>,
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TicketId,
    /// Human readable id, e.g. `TKT-007`
    pub ticket_id: String,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub location: Option<String>,
    pub description: String,
    pub priority: TicketPriority,
    pub assigned_to: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TicketDBResponse> for TicketResponse {
    fn from(db: TicketDBResponse) -> Self {
        Self {
            id: db.id,
            ticket_id: db.ticket_id,
            user_id: db.user_id,
            ticket_type: db.ticket_type,
            location: db.location,
            description: db.description,
            priority: db.priority,
            assigned_to: db.assigned_to,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketEnvelope {
    pub message: String,
    #[serde(rename = "request")]
    pub ticket: TicketResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketListEnvelope {
    pub message: String,
    #[serde(rename = "serviceRequests")]
    pub tickets: Vec<TicketResponse>,
}
