//! Database models for service requests (tickets).

use crate::api::models::tickets::{TicketPriority, TicketStatus};
use crate::types::{TicketId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a ticket. The human readable `ticket_id` is allocated by the
/// store in the same unit of work as the insert.
#[derive(Debug, Clone)]
pub struct TicketCreateDBRequest {
    pub user_id: UserId,
    pub ticket_type: String,
    pub location: Option<String>,
    pub description: String,
    pub priority: TicketPriority,
    pub assigned_to: Option<String>,
    pub status: TicketStatus,
}

#[derive(Debug, Clone)]
pub struct TicketUpdateDBRequest {
    pub ticket_type: String,
    pub location: Option<String>,
    pub description: String,
    pub priority: TicketPriority,
    pub assigned_to: Option<String>,
    pub status: TicketStatus,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TicketDBResponse {
    pub id: TicketId,
    pub ticket_id: String,
    pub user_id: UserId,
    pub ticket_type: String,
    pub location: Option<String>,
    pub description: String,
    pub priority: TicketPriority,
    pub assigned_to: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
