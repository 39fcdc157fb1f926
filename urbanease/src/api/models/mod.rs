//! API request and response data models.
//!
//! These structures define the public JSON contract. They are kept separate from the
//! database models in [`crate::db::models`] so the wire format can keep its legacy keys
//! (`payment_for`, `Service`, `Date_Time`, ...) without leaking them into storage.
//!
//! Request bodies declare their fields as `Option` and are checked with [`required`] and
//! [`required_text`], so a missing field becomes a 400 with a readable message instead of a
//! serde rejection. Type errors (a malformed date, an unknown enum value) still fail during
//! deserialization and are reported as 400 as well.
//!
//! Successful responses wrap the entity together with a human readable `message`:
//!
//! ```json
//! { "message": "Bill created successfully!", "bill": { "id": "...", "billType": "Water" } }
//! ```

pub mod admin_logs;
pub mod auth;
pub mod bills;
pub mod notifications;
pub mod payments;
pub mod permits;
pub mod schedules;
pub mod tickets;
pub mod users;

use crate::errors::Error;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message returned by create requests that miss a mandatory field
pub const ALL_FIELDS_REQUIRED: &str = "All fields are required!";

/// A response that carries only a message, e.g. after a delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Unwrap a mandatory request field.
pub fn required<T>(value: Option<T>) -> Result<T, Error> {
    value.ok_or_else(|| Error::BadRequest {
        message: ALL_FIELDS_REQUIRED.to_string(),
    })
}

/// Unwrap a mandatory text field. Blank strings count as missing; the value is trimmed.
pub fn required_text(value: Option<String>) -> Result<String, Error> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::BadRequest {
            message: ALL_FIELDS_REQUIRED.to_string(),
        }),
    }
}

/// Trim optional text, mapping blank values to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Largest amount a money column holds (`NUMERIC(14, 2)`).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Money amounts must be positive, no larger than [`MAX_AMOUNT`] and carry at most two decimal
/// places.
pub fn positive_amount(value: Option<Decimal>, field: &str) -> Result<Decimal, Error> {
    let amount = required(value)?;
    if amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: format!("{field} must be greater than zero"),
        });
    }
    if amount > MAX_AMOUNT {
        return Err(Error::BadRequest {
            message: format!("{field} must not exceed {MAX_AMOUNT}"),
        });
    }
    if amount.normalize().scale() > 2 {
        return Err(Error::BadRequest {
            message: format!("{field} must have at most two decimal places"),
        });
    }
    Ok(amount)
}
