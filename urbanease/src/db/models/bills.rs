//! Database models for bills.

use crate::api::models::bills::BillStatus;
use crate::types::{BillId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating a new bill
#[derive(Debug, Clone)]
pub struct BillCreateDBRequest {
    pub user_id: UserId,
    pub bill_type: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: BillStatus,
}

/// Database request for replacing the mutable fields of a bill
#[derive(Debug, Clone)]
pub struct BillUpdateDBRequest {
    pub bill_type: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: BillStatus,
}

/// Database response for a bill
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BillDBResponse {
    pub id: BillId,
    pub user_id: UserId,
    pub bill_type: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub user_id: Option<UserId>,
}
