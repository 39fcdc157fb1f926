use std::collections::HashMap;

use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiPath},
        models::{
            MessageResponse,
            bills::{BillCreate, BillEnvelope, BillListEnvelope, BillResponse, BillStatus, BillUpdate, BulkBillingRequest, BulkBillingResponse},
            payments::PaymentResponse,
            positive_amount, required, required_text,
            users::{CurrentUser, UserResponse},
        },
    },
    auth::current_user::require_staff,
    db::models::{
        bills::{BillCreateDBRequest, BillDBResponse, BillFilter, BillUpdateDBRequest},
        payments::PaymentFilter,
    },
    errors::{Error, Result},
    ledger::{self, BulkBillingInstruction},
    types::{BillId, Operation, Resource},
};
use axum::{Json, extract::State, http::StatusCode};

/// Attach the addressed user and the linked ledger legs to each bill.
async fn enrich_bills(state: &AppState, bills: Vec<BillDBResponse>) -> Result<Vec<BillResponse>> {
    if bills.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids = bills.iter().map(|bill| bill.user_id).collect();
    let bill_ids: Vec<BillId> = bills.iter().map(|bill| bill.id).collect();
    let users = state.store.get_users_bulk(user_ids).await?;
    let legs = state
        .store
        .list_payments(&PaymentFilter {
            bill_ids: Some(bill_ids),
            ..Default::default()
        })
        .await?;

    let mut legs_by_bill: HashMap<BillId, Vec<PaymentResponse>> = HashMap::new();
    for leg in legs {
        if let Some(bill_id) = leg.bill_id {
            legs_by_bill.entry(bill_id).or_default().push(PaymentResponse::from(leg));
        }
    }

    Ok(bills
        .into_iter()
        .map(|bill| {
            let user = users.get(&bill.user_id).cloned().map(UserResponse::from);
            let payments = legs_by_bill.remove(&bill.id).unwrap_or_default();
            BillResponse::from(bill).with_user(user).with_payments(payments)
        })
        .collect())
}

/// Create a bill for a resident
#[utoipa::path(
    post,
    path = "/api/bills/add",
    request_body = BillCreate,
    tag = "bills",
    responses(
        (status = 201, description = "Bill created", body = BillEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<BillCreate>,
) -> Result<(StatusCode, Json<BillEnvelope>)> {
    require_staff(&current_user, Operation::Create, Resource::Bills)?;

    let user_id = required(request.user_id)?;
    let bill_type = required_text(request.bill_type)?;
    let due_date = required(request.due_date)?;
    let amount = positive_amount(request.amount, "amount")?;

    if state.store.get_user(user_id).await?.is_none() {
        return Err(Error::not_found("User", user_id));
    }

    let bill = state
        .store
        .create_bill(&BillCreateDBRequest {
            user_id,
            bill_type,
            amount,
            due_date,
            status: request.status.unwrap_or(BillStatus::Pending),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BillEnvelope {
            message: "Bill created successfully!".to_string(),
            bill: BillResponse::from(bill),
        }),
    ))
}

/// List all bills with their user and payments
#[utoipa::path(
    get,
    path = "/api/bills/all",
    tag = "bills",
    responses(
        (status = 200, description = "All bills", body = BillListEnvelope),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_bills(State(state): State<AppState>, _: CurrentUser) -> Result<Json<BillListEnvelope>> {
    let bills = state.store.list_bills(&BillFilter::default()).await?;
    let bills = enrich_bills(&state, bills).await?;

    Ok(Json(BillListEnvelope {
        message: "Success fetching all bills!".to_string(),
        bills,
    }))
}

/// Get a bill with its user and payments
#[utoipa::path(
    get,
    path = "/api/bills/get/{id}",
    tag = "bills",
    params(("id" = uuid::Uuid, Path, description = "Bill ID")),
    responses(
        (status = 200, description = "Bill", body = BillEnvelope),
        (status = 404, description = "Bill not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_bill(State(state): State<AppState>, _: CurrentUser, ApiPath(id): ApiPath<BillId>) -> Result<Json<BillEnvelope>> {
    let bill = state.store.get_bill(id).await?.ok_or_else(|| Error::not_found("Bill", id))?;
    let bill = enrich_bills(&state, vec![bill])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("Bill", id))?;

    Ok(Json(BillEnvelope {
        message: "Success fetching bill!".to_string(),
        bill,
    }))
}

/// Replace a bill's details
#[utoipa::path(
    put,
    path = "/api/bills/update/{id}",
    request_body = BillUpdate,
    tag = "bills",
    params(("id" = uuid::Uuid, Path, description = "Bill ID")),
    responses(
        (status = 200, description = "Bill updated", body = BillEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Bill not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<BillId>,
    ApiJson(request): ApiJson<BillUpdate>,
) -> Result<Json<BillEnvelope>> {
    require_staff(&current_user, Operation::Update, Resource::Bills)?;

    let existing = state.store.get_bill(id).await?.ok_or_else(|| Error::not_found("Bill", id))?;

    let bill = state
        .store
        .update_bill(
            id,
            &BillUpdateDBRequest {
                bill_type: required_text(request.bill_type)?,
                amount: positive_amount(request.amount, "amount")?,
                due_date: required(request.due_date)?,
                status: request.status.unwrap_or(existing.status),
            },
        )
        .await?;

    Ok(Json(BillEnvelope {
        message: "Bill updated successfully!".to_string(),
        bill: BillResponse::from(bill),
    }))
}

/// Delete a bill. Payments that referenced it are kept and detached.
#[utoipa::path(
    delete,
    path = "/api/bills/delete/{id}",
    tag = "bills",
    params(("id" = uuid::Uuid, Path, description = "Bill ID")),
    responses(
        (status = 200, description = "Bill deleted", body = MessageResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Bill not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<BillId>,
) -> Result<Json<MessageResponse>> {
    require_staff(&current_user, Operation::Delete, Resource::Bills)?;

    if state.store.get_bill(id).await?.is_none() || !state.store.delete_bill(id).await? {
        return Err(Error::not_found("Bill", id));
    }

    Ok(Json(MessageResponse::new("Bill deleted successfully!")))
}

/// Charge every matching resident the same amount in one balanced transaction
#[utoipa::path(
    post,
    path = "/api/bills/residents",
    request_body = BulkBillingRequest,
    tag = "bills",
    responses(
        (status = 200, description = "Residents billed", body = BulkBillingResponse),
        (status = 400, description = "Missing fields, invalid amount, or no matching residents"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Initiating account not found"),
        (status = 500, description = "Transaction failed; nothing was written"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn bill_residents(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<BulkBillingRequest>,
) -> Result<Json<BulkBillingResponse>> {
    require_staff(&current_user, Operation::Create, Resource::Ledger)?;

    let instruction = BulkBillingInstruction {
        initiator: required(request.user_id)?,
        amount: required(request.amount_paid)?,
        payment_method: required_text(request.payment_method)?,
        filter: required(request.stand_type)?,
        payment_for: required_text(request.payment_for)?,
        description: request.description,
    };

    let receipt = ledger::bill_residents(state.store.as_ref(), instruction).await?;

    Ok(Json(BulkBillingResponse {
        message: "Transaction success".to_string(),
        transaction_id: receipt.transaction_id,
        residents_billed: receipt.residents_billed,
        total_amount: receipt.total_amount,
    }))
}
