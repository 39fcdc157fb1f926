//! Database models for payments.
//!
//! A payment row is one leg of a double-entry transaction. Legs of the same logical
//! transaction share `transaction_id`; the ledger writes them through a [`LedgerPosting`] so
//! that either every leg lands or none does.

use crate::api::models::payments::{PaymentStatus, TransactionCode};
use crate::types::{BillId, PaymentId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for inserting a single payment leg
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCreateDBRequest {
    pub account: UserId,
    pub bill_id: Option<BillId>,
    pub amount_paid: Decimal,
    pub payment_method: String,
    pub transaction_code: TransactionCode,
    pub status: PaymentStatus,
    pub payment_for: String,
    pub reference: String,
    pub transaction_id: String,
    pub description: Option<String>,
}

/// Database request for replacing the mutable fields of a leg. Account, code and
/// transaction id are fixed once posted.
#[derive(Debug, Clone)]
pub struct PaymentUpdateDBRequest {
    pub amount_paid: Decimal,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub payment_for: String,
    pub description: Option<String>,
}

/// Database response for a payment leg
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentDBResponse {
    pub id: PaymentId,
    pub account: UserId,
    pub bill_id: Option<BillId>,
    pub amount_paid: Decimal,
    pub payment_method: String,
    pub transaction_code: TransactionCode,
    pub status: PaymentStatus,
    pub payment_for: String,
    pub reference: String,
    pub transaction_id: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing payment legs, ordered by creation time.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub account: Option<UserId>,
    pub bill_ids: Option<Vec<BillId>>,
    pub transaction_id: Option<String>,
}

/// Everything a store needs to write one logical transaction atomically: insert every leg,
/// then settle `settle_bill` if its paid legs now cover the amount owed.
#[derive(Debug, Clone)]
pub struct LedgerPosting {
    pub transaction_id: String,
    pub legs: Vec<PaymentCreateDBRequest>,
    pub settle_bill: Option<BillId>,
}

/// The result of a successful posting, legs in the order they were planned.
#[derive(Debug, Clone)]
pub struct PostedTransaction {
    pub transaction_id: String,
    pub legs: Vec<PaymentDBResponse>,
}
