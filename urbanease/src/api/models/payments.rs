//! API request/response models for payments and the ledger.

use crate::api::models::bills::BillResponse;
use crate::api::models::users::UserResponse;
use crate::db::models::payments::PaymentDBResponse;
use crate::types::{BillId, PaymentId, UserId, closed_enum};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

closed_enum! {
    /// State of a single ledger leg
    pub enum PaymentStatus as "payment_status" {
        Paid => "PAID",
        Debited => "DEBITED",
        Credited => "CREDITED",
    }
}

/// Direction of a ledger leg. Stored and serialized as the integers `1` and `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i32", into = "i32")]
#[repr(i32)]
pub enum TransactionCode {
    Credit = 1,
    Debit = -1,
}

impl TransactionCode {
    pub fn opposite(self) -> Self {
        match self {
            TransactionCode::Credit => TransactionCode::Debit,
            TransactionCode::Debit => TransactionCode::Credit,
        }
    }

    /// The leg's contribution to a transaction's balance
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionCode::Credit => amount,
            TransactionCode::Debit => -amount,
        }
    }
}

impl TryFrom<i32> for TransactionCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TransactionCode::Credit),
            -1 => Ok(TransactionCode::Debit),
            other => Err(format!("invalid transaction code {other}, expected 1 or -1")),
        }
    }
}

impl From<TransactionCode> for i32 {
    fn from(code: TransactionCode) -> Self {
        code as i32
    }
}

/// Body of `POST /api/payments/add`: a single manually entered leg
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub bill_id: Option<BillId>,
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<String>,
    /// Defaults to `1`
    #[schema(value_type = Option<i32>)]
    pub transaction_code: Option<TransactionCode>,
    pub status: Option<PaymentStatus>,
    #[serde(rename = "payment_for")]
    pub payment_for: Option<String>,
    pub description: Option<String>,
    /// Defaults to a freshly allocated `PYM-` id
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<String>,
    pub status: Option<PaymentStatus>,
    #[serde(rename = "payment_for")]
    pub payment_for: Option<String>,
    pub description: Option<String>,
}

/// Body of `POST /api/payments/pay`: a balanced two-leg payment against the treasury account
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SinglePaymentRequest {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<String>,
    /// `1` when the resident pays, `-1` when the resident is charged
    pub transaction_code: Option<i32>,
    #[serde(rename = "payment_for")]
    pub payment_for: Option<String>,
    pub description: Option<String>,
    /// Bill being settled; must belong to the payer
    #[schema(value_type = Option<String>, format = "uuid")]
    pub bill_id: Option<BillId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SinglePaymentResponse {
    pub message: String,
    pub transaction_id: String,
    /// The payer leg followed by the treasury leg
    pub payments: Vec<PaymentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentId,
    #[schema(value_type = String, format = "uuid")]
    pub account: UserId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub bill_id: Option<BillId>,
    pub amount_paid: Decimal,
    pub payment_method: String,
    #[schema(value_type = i32)]
    pub transaction_code: TransactionCode,
    pub status: PaymentStatus,
    #[serde(rename = "payment_for")]
    pub payment_for: String,
    pub reference: String,
    pub transaction_id: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
    /// Note: no_recursion stops utoipa from following payment -> bill -> payment forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub bill: Option<Box<BillResponse>>,
}

impl From<PaymentDBResponse> for PaymentResponse {
    fn from(db: PaymentDBResponse) -> Self {
        Self {
            id: db.id,
            account: db.account,
            bill_id: db.bill_id,
            amount_paid: db.amount_paid,
            payment_method: db.payment_method,
            transaction_code: db.transaction_code,
            status: db.status,
            payment_for: db.payment_for,
            reference: db.reference,
            transaction_id: db.transaction_id,
            description: db.description,
            created_at: db.created_at,
            user: None,
            bill: None,
        }
    }
}

impl PaymentResponse {
    pub fn with_user(mut self, user: Option<UserResponse>) -> Self {
        self.user = user;
        self
    }

    pub fn with_bill(mut self, bill: Option<BillResponse>) -> Self {
        self.bill = bill.map(Box::new);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentEnvelope {
    pub message: String,
    pub payment: PaymentResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentListEnvelope {
    pub message: String,
    pub payments: Vec<PaymentResponse>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatementQuery {
    /// Account whose legs are listed
    #[param(value_type = Option<String>, format = "uuid")]
    pub account: Option<UserId>,
}

/// All legs of one account with running totals. A positive balance means the account owes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    pub message: String,
    #[schema(value_type = String, format = "uuid")]
    pub account: UserId,
    pub total_charges: Decimal,
    pub total_payments: Decimal,
    pub balance: Decimal,
    pub entries: Vec<PaymentResponse>,
}
