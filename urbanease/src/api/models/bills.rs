//! API request/response models for bills and bulk billing.

use crate::api::models::payments::PaymentResponse;
use crate::api::models::users::UserResponse;
use crate::db::models::bills::BillDBResponse;
use crate::db::models::users::ResidentFilter;
use crate::types::{BillId, UserId, closed_enum};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

closed_enum! {
    pub enum BillStatus as "bill_status" {
        Pending => "PENDING",
        Paid => "PAID",
        Overdue => "OVERDUE",
        Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub bill_type: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    /// Defaults to `PENDING`
    pub status: Option<BillStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillUpdate {
    pub bill_type: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<BillStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BillId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub bill_type: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The resident the bill is addressed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
    /// Ledger legs linked to this bill
    /// Note: no_recursion stops utoipa from following bill -> payment -> bill forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub payments: Option<Vec<PaymentResponse>>,
}

impl From<BillDBResponse> for BillResponse {
    fn from(db: BillDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            bill_type: db.bill_type,
            amount: db.amount,
            due_date: db.due_date,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
            user: None,
            payments: None,
        }
    }
}

impl BillResponse {
    pub fn with_user(mut self, user: Option<UserResponse>) -> Self {
        self.user = user;
        self
    }

    pub fn with_payments(mut self, payments: Vec<PaymentResponse>) -> Self {
        self.payments = Some(payments);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BillEnvelope {
    pub message: String,
    pub bill: BillResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BillListEnvelope {
    pub message: String,
    pub bills: Vec<BillResponse>,
}

/// Body of `POST /api/bills/residents`: charge every matching resident the same amount.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkBillingRequest {
    /// The account raising the charge; it receives the aggregate credit leg
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    /// Amount charged to each resident
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<String>,
    pub description: Option<String>,
    /// `ALL` (every non-system account) or a single stand type
    #[schema(value_type = Option<String>, example = "RESIDENTIAL")]
    pub stand_type: Option<ResidentFilter>,
    #[serde(rename = "payment_for")]
    pub payment_for: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkBillingResponse {
    pub message: String,
    pub transaction_id: String,
    pub residents_billed: usize,
    /// Amount of the aggregate credit leg
    pub total_amount: Decimal,
}
