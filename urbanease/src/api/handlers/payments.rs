use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiPath, ApiQuery},
        models::{
            MessageResponse,
            bills::BillResponse,
            payments::{
                PaymentCreate, PaymentEnvelope, PaymentListEnvelope, PaymentResponse, PaymentStatus, PaymentUpdate, SinglePaymentRequest,
                SinglePaymentResponse, StatementQuery, StatementResponse, TransactionCode,
            },
            positive_amount, required, required_text,
            users::{CurrentUser, UserResponse},
        },
    },
    auth::current_user::{require_owner_or_staff, require_staff},
    db::models::{
        payments::{PaymentCreateDBRequest, PaymentDBResponse, PaymentFilter, PaymentUpdateDBRequest},
        sequences::SequenceKind,
    },
    errors::{Error, Result},
    ledger::{self, PaymentInstruction},
    types::{Operation, PaymentId, Resource},
};
use axum::{Json, extract::State, http::StatusCode};

/// Attach the account holder and the referenced bill to each leg.
async fn enrich_payments(state: &AppState, payments: Vec<PaymentDBResponse>) -> Result<Vec<PaymentResponse>> {
    if payments.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids = payments.iter().map(|leg| leg.account).collect();
    let bill_ids = payments.iter().filter_map(|leg| leg.bill_id).collect();
    let users = state.store.get_users_bulk(user_ids).await?;
    let bills = state.store.get_bills_bulk(bill_ids).await?;

    Ok(payments
        .into_iter()
        .map(|leg| {
            let user = users.get(&leg.account).cloned().map(UserResponse::from);
            let bill = leg.bill_id.and_then(|id| bills.get(&id)).cloned().map(BillResponse::from);
            PaymentResponse::from(leg).with_user(user).with_bill(bill)
        })
        .collect())
}

/// Record a single ledger leg by hand
#[utoipa::path(
    post,
    path = "/api/payments/add",
    request_body = PaymentCreate,
    tag = "payments",
    responses(
        (status = 201, description = "Payment created", body = PaymentEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User or bill not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<PaymentCreate>,
) -> Result<(StatusCode, Json<PaymentEnvelope>)> {
    require_staff(&current_user, Operation::Create, Resource::Payments)?;

    let account = required(request.user_id)?;
    let amount_paid = positive_amount(request.amount_paid, "amountPaid")?;
    let payment_method = required_text(request.payment_method)?;
    let payment_for = required_text(request.payment_for)?;

    if state.store.get_user(account).await?.is_none() {
        return Err(Error::not_found("User", account));
    }
    if let Some(bill_id) = request.bill_id
        && state.store.get_bill(bill_id).await?.is_none()
    {
        return Err(Error::not_found("Bill", bill_id));
    }

    let transaction_code = request.transaction_code.unwrap_or(TransactionCode::Credit);
    let status = request.status.unwrap_or(match transaction_code {
        TransactionCode::Credit => PaymentStatus::Paid,
        TransactionCode::Debit => PaymentStatus::Debited,
    });
    let transaction_id = match request.transaction_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => state.store.next_sequence_id(SequenceKind::Payment).await?,
    };

    let payment = state
        .store
        .create_payment(&PaymentCreateDBRequest {
            account,
            bill_id: request.bill_id,
            reference: ledger::reference(account, &payment_for, amount_paid),
            amount_paid,
            payment_method,
            transaction_code,
            status,
            payment_for,
            transaction_id,
            description: request.description,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentEnvelope {
            message: "Payment created successfully!".to_string(),
            payment: PaymentResponse::from(payment),
        }),
    ))
}

/// List all payments with their user and bill
#[utoipa::path(
    get,
    path = "/api/payments/all",
    tag = "payments",
    responses(
        (status = 200, description = "All payments", body = PaymentListEnvelope),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_payments(State(state): State<AppState>, _: CurrentUser) -> Result<Json<PaymentListEnvelope>> {
    let payments = state.store.list_payments(&PaymentFilter::default()).await?;
    let payments = enrich_payments(&state, payments).await?;

    Ok(Json(PaymentListEnvelope {
        message: "Success fetching all payments!".to_string(),
        payments,
    }))
}

/// Get a payment with its user and bill
#[utoipa::path(
    get,
    path = "/api/payments/get/{id}",
    tag = "payments",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment", body = PaymentEnvelope),
        (status = 404, description = "Payment not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_payment(
    State(state): State<AppState>,
    _: CurrentUser,
    ApiPath(id): ApiPath<PaymentId>,
) -> Result<Json<PaymentEnvelope>> {
    let payment = state.store.get_payment(id).await?.ok_or_else(|| Error::not_found("Payment", id))?;
    let payment = enrich_payments(&state, vec![payment])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("Payment", id))?;

    Ok(Json(PaymentEnvelope {
        message: "Success fetching payment!".to_string(),
        payment,
    }))
}

/// Correct a payment leg. The account, direction and transaction id are fixed once written.
#[utoipa::path(
    put,
    path = "/api/payments/update/{id}",
    request_body = PaymentUpdate,
    tag = "payments",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment updated", body = PaymentEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Payment not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<PaymentId>,
    ApiJson(request): ApiJson<PaymentUpdate>,
) -> Result<Json<PaymentEnvelope>> {
    require_staff(&current_user, Operation::Update, Resource::Payments)?;

    let existing = state.store.get_payment(id).await?.ok_or_else(|| Error::not_found("Payment", id))?;

    let payment = state
        .store
        .update_payment(
            id,
            &PaymentUpdateDBRequest {
                amount_paid: positive_amount(request.amount_paid, "amountPaid")?,
                payment_method: required_text(request.payment_method)?,
                status: request.status.unwrap_or(existing.status),
                payment_for: required_text(request.payment_for)?,
                description: request.description,
            },
        )
        .await?;

    Ok(Json(PaymentEnvelope {
        message: "Payment updated successfully!".to_string(),
        payment: PaymentResponse::from(payment),
    }))
}

/// Delete a single payment leg
#[utoipa::path(
    delete,
    path = "/api/payments/delete/{id}",
    tag = "payments",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment deleted", body = MessageResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Payment not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<PaymentId>,
) -> Result<Json<MessageResponse>> {
    require_staff(&current_user, Operation::Delete, Resource::Payments)?;

    if state.store.get_payment(id).await?.is_none() || !state.store.delete_payment(id).await? {
        return Err(Error::not_found("Payment", id));
    }

    Ok(Json(MessageResponse::new("Payment deleted successfully!")))
}

/// Record a balanced payment between an account and the treasury
#[utoipa::path(
    post,
    path = "/api/payments/pay",
    request_body = SinglePaymentRequest,
    tag = "payments",
    responses(
        (status = 201, description = "Payment recorded", body = SinglePaymentResponse),
        (status = 400, description = "Missing fields, invalid amount or transaction code, or a bill of another account"),
        (status = 403, description = "Residents may only pay for themselves"),
        (status = 404, description = "Account or bill not found"),
        (status = 500, description = "Transaction failed; nothing was written"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn pay(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<SinglePaymentRequest>,
) -> Result<(StatusCode, Json<SinglePaymentResponse>)> {
    let payer = required(request.user_id)?;
    require_owner_or_staff(&current_user, payer, Operation::Create, Resource::Payments)?;

    let instruction = PaymentInstruction {
        payer,
        amount: required(request.amount_paid)?,
        payment_method: required_text(request.payment_method)?,
        direction: request.transaction_code.unwrap_or(i32::from(TransactionCode::Credit)),
        payment_for: required_text(request.payment_for)?,
        description: request.description,
        bill_id: request.bill_id,
    };

    let receipt = ledger::record_payment(state.store.as_ref(), state.treasury_account, instruction).await?;

    Ok((
        StatusCode::CREATED,
        Json(SinglePaymentResponse {
            message: "Transaction success".to_string(),
            transaction_id: receipt.transaction_id,
            payments: receipt.legs.into_iter().map(PaymentResponse::from).collect(),
        }),
    ))
}

/// An account's ledger legs with charge and payment totals
#[utoipa::path(
    get,
    path = "/api/payments/statement",
    tag = "payments",
    params(StatementQuery),
    responses(
        (status = 200, description = "Account statement", body = StatementResponse),
        (status = 400, description = "Missing account"),
        (status = 403, description = "Residents may only read their own statement"),
        (status = 404, description = "Account not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_statement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiQuery(query): ApiQuery<StatementQuery>,
) -> Result<Json<StatementResponse>> {
    let account = query.account.ok_or_else(|| Error::BadRequest {
        message: "account is required as a query parameter!".to_string(),
    })?;
    require_owner_or_staff(&current_user, account, Operation::Read, Resource::Ledger)?;

    let statement = ledger::statement(state.store.as_ref(), account).await?;

    Ok(Json(StatementResponse {
        message: "Success fetching statement!".to_string(),
        account: statement.account,
        total_charges: statement.total_charges,
        total_payments: statement.total_payments,
        balance: statement.balance,
        entries: statement.entries.into_iter().map(PaymentResponse::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            bills::BillStatus,
            payments::{PaymentEnvelope, PaymentListEnvelope, PaymentStatus, SinglePaymentResponse, StatementResponse, TransactionCode},
            users::StandType,
        },
        db::{Store, models::bills::BillCreateDBRequest},
        test_utils::*,
    };
    use axum::http::StatusCode;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;
    use uuid::Uuid;

    fn pay_body(payer: Uuid, amount: i64, code: i32) -> serde_json::Value {
        json!({
            "userId": payer,
            "amountPaid": amount,
            "paymentMethod": "EcoCash",
            "transactionCode": code,
            "payment_for": "Water",
            "description": "October water"
        })
    }

    #[test_log::test(tokio::test)]
    async fn test_single_payment_writes_opposite_legs() {
        let (server, store) = create_test_app().await;
        let admin = get_admin_user(&store).await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        let response = server
            .post("/api/payments/pay")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&pay_body(resident.id, 80, 1))
            .await;
        response.assert_status(StatusCode::CREATED);
        let receipt: SinglePaymentResponse = response.json();
        assert_eq!(receipt.message, "Transaction success");
        assert!(receipt.transaction_id.starts_with("PYM-"));
        assert_eq!(receipt.payments.len(), 2);

        let payer = &receipt.payments[0];
        let treasury = &receipt.payments[1];
        assert_eq!(payer.account, resident.id);
        assert_eq!(payer.transaction_code, TransactionCode::Credit);
        assert_eq!(payer.status, PaymentStatus::Paid);
        assert_eq!(treasury.account, admin.id);
        assert_eq!(treasury.transaction_code, TransactionCode::Debit);
        assert_eq!(treasury.amount_paid, payer.amount_paid);
        assert_eq!(treasury.transaction_id, payer.transaction_id);
        assert_eq!(treasury.reference, payer.reference);
    }

    #[test_log::test(tokio::test)]
    async fn test_payment_against_bill_settles_it() {
        let (server, store) = create_test_app().await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let bill = store
            .create_bill(&BillCreateDBRequest {
                user_id: resident.id,
                bill_type: "Water".to_string(),
                amount: Decimal::from(80),
                due_date: Utc::now(),
                status: BillStatus::Pending,
            })
            .await
            .unwrap();
        let headers = add_auth_headers(&resident);

        let mut body = pay_body(resident.id, 80, 1);
        body["billId"] = json!(bill.id);
        server
            .post("/api/payments/pay")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);

        let settled = store.get_bill(bill.id).await.unwrap().unwrap();
        assert_eq!(settled.status, BillStatus::Paid);

        // Another resident's bill is refused
        let other = create_test_resident(&store, StandType::Residential).await;
        let other_headers = add_auth_headers(&other);
        let mut body = pay_body(other.id, 10, 1);
        body["billId"] = json!(bill.id);
        server
            .post("/api/payments/pay")
            .add_header(&other_headers[0].0, &other_headers[0].1)
            .json(&body)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_single_payment_validation() {
        let (server, store) = create_test_app().await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        let bad_code = server
            .post("/api/payments/pay")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&pay_body(resident.id, 10, 3))
            .await;
        bad_code.assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/payments/pay")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&pay_body(resident.id, 0, 1))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Residents cannot pay on behalf of someone else
        let other = create_test_resident(&store, StandType::Residential).await;
        server
            .post("/api/payments/pay")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&pay_body(other.id, 10, 1))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let staff = create_test_staff(&store).await;
        let staff_headers = add_auth_headers(&staff);
        server
            .post("/api/payments/pay")
            .add_header(&staff_headers[0].0, &staff_headers[0].1)
            .json(&pay_body(Uuid::new_v4(), 10, 1))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let legs = store.list_payments(&Default::default()).await.unwrap();
        assert!(legs.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_statement_totals() {
        let (server, store) = create_test_app().await;
        let admin = get_admin_user(&store).await;
        let admin_headers = add_auth_headers(&admin);
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        server
            .post("/api/bills/residents")
            .add_header(&admin_headers[0].0, &admin_headers[0].1)
            .json(&json!({
                "userId": admin.id,
                "amountPaid": 50,
                "paymentMethod": "Cash",
                "standType": "RESIDENTIAL",
                "payment_for": "Refuse"
            }))
            .await
            .assert_status_ok();
        server
            .post("/api/payments/pay")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&pay_body(resident.id, 30, 1))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get("/api/payments/statement")
            .add_query_param("account", resident.id)
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        response.assert_status_ok();
        let statement: StatementResponse = response.json();
        assert_eq!(statement.entries.len(), 2);
        assert_eq!(statement.total_charges, Decimal::from(50));
        assert_eq!(statement.total_payments, Decimal::from(30));
        assert_eq!(statement.balance, Decimal::from(20));

        let missing = server
            .get("/api/payments/statement")
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        missing.assert_status(StatusCode::BAD_REQUEST);

        server
            .get("/api/payments/statement")
            .add_query_param("account", admin.id)
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_manual_payment_crud() {
        let (server, store) = create_test_app().await;
        let admin = get_admin_user(&store).await;
        let headers = add_auth_headers(&admin);
        let resident = create_test_resident(&store, StandType::Commercial).await;

        let response = server
            .post("/api/payments/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({
                "userId": resident.id,
                "amountPaid": 25,
                "paymentMethod": "Bank transfer",
                "payment_for": "Rates"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: PaymentEnvelope = response.json();
        assert_eq!(created.message, "Payment created successfully!");
        assert_eq!(created.payment.transaction_code, TransactionCode::Credit);
        assert_eq!(created.payment.status, PaymentStatus::Paid);
        assert!(created.payment.transaction_id.starts_with("PYM-"));
        assert_eq!(created.payment.reference, format!("{}_Rates_25", resident.id));

        let missing_bill = Uuid::new_v4();
        let response = server
            .post("/api/payments/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({
                "userId": resident.id,
                "billId": missing_bill,
                "amountPaid": 25,
                "paymentMethod": "Bank transfer",
                "payment_for": "Rates"
            }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({"message": format!("Bill with ID {missing_bill} not found")}));

        let fetched: PaymentEnvelope = server
            .get(&format!("/api/payments/get/{}", created.payment.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .json();
        assert_eq!(fetched.payment.user.as_ref().map(|u| u.id), Some(resident.id));

        let updated = server
            .put(&format!("/api/payments/update/{}", created.payment.id))
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"amountPaid": 30, "paymentMethod": "Cash", "payment_for": "Rates", "status": "credited"}))
            .await;
        updated.assert_status_ok();
        let updated: PaymentEnvelope = updated.json();
        assert_eq!(updated.payment.amount_paid, Decimal::from(30));
        assert_eq!(updated.payment.status, PaymentStatus::Credited);

        let all: PaymentListEnvelope = server
            .get("/api/payments/all")
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .json();
        assert_eq!(all.payments.len(), 1);

        server
            .delete(&format!("/api/payments/delete/{}", created.payment.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status_ok();
        server
            .delete(&format!("/api/payments/delete/{}", created.payment.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let resident_headers = add_auth_headers(&resident);
        server
            .post("/api/payments/add")
            .add_header(&resident_headers[0].0, &resident_headers[0].1)
            .json(&json!({"userId": resident.id, "amountPaid": 25, "paymentMethod": "Cash", "payment_for": "Rates"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
