use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiPath, ApiQuery},
        models::{
            MessageResponse,
            permits::{PermitCreate, PermitEnvelope, PermitListEnvelope, PermitResponse, PermitStatus, PermitUpdate, PermitsByUserQuery},
            required, required_text,
            users::{CurrentUser, UserResponse},
        },
    },
    auth::current_user::{require_owner_or_staff, require_staff},
    db::models::permits::{PermitCreateDBRequest, PermitDBResponse, PermitFilter, PermitUpdateDBRequest},
    errors::{Error, Result},
    types::{Operation, PermitId, Resource},
};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

async fn with_applicants(state: &AppState, permits: Vec<PermitDBResponse>) -> Result<Vec<PermitResponse>> {
    let user_ids = permits.iter().map(|permit| permit.user_id).collect();
    let users = state.store.get_users_bulk(user_ids).await?;

    Ok(permits
        .into_iter()
        .map(|permit| {
            let user = users.get(&permit.user_id).cloned().map(UserResponse::from);
            PermitResponse::from(permit).with_user(user)
        })
        .collect())
}

/// Submit a permit application
#[utoipa::path(
    post,
    path = "/api/permits/add",
    request_body = PermitCreate,
    tag = "permits",
    responses(
        (status = 201, description = "Permit created", body = PermitEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Residents may only apply for themselves"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_permit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<PermitCreate>,
) -> Result<(StatusCode, Json<PermitEnvelope>)> {
    let user_id = required(request.user_id)?;
    require_owner_or_staff(&current_user, user_id, Operation::Create, Resource::Permits)?;

    let permit_type = required_text(request.permit_type)?;
    let description = required_text(request.description)?;
    let location = required_text(request.location)?;

    // Residents cannot file an application as already approved
    let status = match request.status {
        Some(status) if status != PermitStatus::Pending => {
            require_staff(&current_user, Operation::Update, Resource::Permits)?;
            status
        }
        _ => PermitStatus::Pending,
    };

    if state.store.get_user(user_id).await?.is_none() {
        return Err(Error::not_found("User", user_id));
    }

    let permit = state
        .store
        .create_permit(&PermitCreateDBRequest {
            user_id,
            permit_type,
            description,
            location,
            submission_date: request.submission_date.unwrap_or_else(Utc::now),
            status,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PermitEnvelope {
            message: "Permit created successfully!".to_string(),
            permit: PermitResponse::from(permit),
        }),
    ))
}

/// List all permit applications
#[utoipa::path(
    get,
    path = "/api/permits/all",
    tag = "permits",
    responses(
        (status = 200, description = "All permits", body = PermitListEnvelope),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_permits(State(state): State<AppState>, _: CurrentUser) -> Result<Json<PermitListEnvelope>> {
    let permits = state.store.list_permits(&PermitFilter::default()).await?;

    Ok(Json(PermitListEnvelope {
        message: "Success fetching all permits!".to_string(),
        permits: with_applicants(&state, permits).await?,
    }))
}

/// List one resident's permit applications
#[utoipa::path(
    get,
    path = "/api/permits/all-by-user-id",
    tag = "permits",
    params(PermitsByUserQuery),
    responses(
        (status = 200, description = "The user's permits", body = PermitListEnvelope),
        (status = 400, description = "Missing userId"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_permits_by_user(
    State(state): State<AppState>,
    _: CurrentUser,
    ApiQuery(query): ApiQuery<PermitsByUserQuery>,
) -> Result<Json<PermitListEnvelope>> {
    let user_id = query.user_id.ok_or_else(|| Error::BadRequest {
        message: "userId is required as a query parameter!".to_string(),
    })?;

    let permits = state.store.list_permits(&PermitFilter { user_id: Some(user_id) }).await?;

    Ok(Json(PermitListEnvelope {
        message: "Success fetching permits!".to_string(),
        permits: with_applicants(&state, permits).await?,
    }))
}

/// Get a permit application
#[utoipa::path(
    get,
    path = "/api/permits/get/{id}",
    tag = "permits",
    params(("id" = uuid::Uuid, Path, description = "Permit ID")),
    responses(
        (status = 200, description = "Permit", body = PermitEnvelope),
        (status = 404, description = "Permit not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_permit(State(state): State<AppState>, _: CurrentUser, ApiPath(id): ApiPath<PermitId>) -> Result<Json<PermitEnvelope>> {
    let permit = state.store.get_permit(id).await?.ok_or_else(|| Error::not_found("Permit", id))?;
    let permit = with_applicants(&state, vec![permit])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("Permit", id))?;

    Ok(Json(PermitEnvelope {
        message: "Success fetching permit!".to_string(),
        permit,
    }))
}

/// Replace a permit application's details. Only staff may change its status.
#[utoipa::path(
    put,
    path = "/api/permits/update/{id}",
    request_body = PermitUpdate,
    tag = "permits",
    params(("id" = uuid::Uuid, Path, description = "Permit ID")),
    responses(
        (status = 200, description = "Permit updated", body = PermitEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Not the applicant, or a resident changing the status"),
        (status = 404, description = "Permit not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_permit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<PermitId>,
    ApiJson(request): ApiJson<PermitUpdate>,
) -> Result<Json<PermitEnvelope>> {
    let existing = state.store.get_permit(id).await?.ok_or_else(|| Error::not_found("Permit", id))?;
    require_owner_or_staff(&current_user, existing.user_id, Operation::Update, Resource::Permits)?;

    let status = request.status.unwrap_or(existing.status);
    if status != existing.status {
        require_staff(&current_user, Operation::Update, Resource::Permits)?;
    }

    let permit = state
        .store
        .update_permit(
            id,
            &PermitUpdateDBRequest {
                permit_type: required_text(request.permit_type)?,
                description: required_text(request.description)?,
                location: required_text(request.location)?,
                submission_date: request.submission_date.unwrap_or(existing.submission_date),
                status,
            },
        )
        .await?;

    Ok(Json(PermitEnvelope {
        message: "Permit updated successfully!".to_string(),
        permit: PermitResponse::from(permit),
    }))
}

/// Withdraw or remove a permit application
#[utoipa::path(
    delete,
    path = "/api/permits/delete/{id}",
    tag = "permits",
    params(("id" = uuid::Uuid, Path, description = "Permit ID")),
    responses(
        (status = 200, description = "Permit deleted", body = MessageResponse),
        (status = 403, description = "Not the applicant"),
        (status = 404, description = "Permit not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_permit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<PermitId>,
) -> Result<Json<MessageResponse>> {
    let existing = state.store.get_permit(id).await?.ok_or_else(|| Error::not_found("Permit", id))?;
    require_owner_or_staff(&current_user, existing.user_id, Operation::Delete, Resource::Permits)?;

    if !state.store.delete_permit(id).await? {
        return Err(Error::not_found("Permit", id));
    }

    Ok(Json(MessageResponse::new("Permit deleted successfully!")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            permits::{PermitEnvelope, PermitListEnvelope, PermitStatus},
            users::StandType,
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;

    fn permit_body(user_id: uuid::Uuid) -> serde_json::Value {
        json!({
            "userId": user_id,
            "permitType": "Building",
            "description": "Boundary wall",
            "location": "Stand 42, Ward 7"
        })
    }

    #[test_log::test(tokio::test)]
    async fn test_resident_applies_and_staff_approves() {
        let (server, store) = create_test_app().await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        let response = server
            .post("/api/permits/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&permit_body(resident.id))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: PermitEnvelope = response.json();
        assert_eq!(created.message, "Permit created successfully!");
        assert_eq!(created.permit.status, PermitStatus::Pending);

        let mut approve = permit_body(resident.id);
        approve["status"] = json!("approved");
        server
            .put(&format!("/api/permits/update/{}", created.permit.id))
            .add_header(&headers[0].0, &headers[0].1)
            .json(&approve)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let staff = create_test_staff(&store).await;
        let staff_headers = add_auth_headers(&staff);
        let response = server
            .put(&format!("/api/permits/update/{}", created.permit.id))
            .add_header(&staff_headers[0].0, &staff_headers[0].1)
            .json(&approve)
            .await;
        response.assert_status_ok();
        let updated: PermitEnvelope = response.json();
        assert_eq!(updated.permit.status, PermitStatus::Approved);
        assert_eq!(updated.permit.submission_date, created.permit.submission_date);

        let fetched: PermitEnvelope = server
            .get(&format!("/api/permits/get/{}", created.permit.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .json();
        assert_eq!(fetched.permit.user.map(|u| u.id), Some(resident.id));
    }

    #[test_log::test(tokio::test)]
    async fn test_permits_by_user() {
        let (server, store) = create_test_app().await;
        let first = create_test_resident(&store, StandType::Residential).await;
        let second = create_test_resident(&store, StandType::Commercial).await;
        let admin = get_admin_user(&store).await;
        let headers = add_auth_headers(&admin);

        for user in [&first, &first, &second] {
            server
                .post("/api/permits/add")
                .add_header(&headers[0].0, &headers[0].1)
                .json(&permit_body(user.id))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = server
            .get("/api/permits/all-by-user-id")
            .add_query_param("userId", first.id)
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        response.assert_status_ok();
        let listed: PermitListEnvelope = response.json();
        assert_eq!(listed.message, "Success fetching permits!");
        assert_eq!(listed.permits.len(), 2);
        assert!(listed.permits.iter().all(|p| p.user_id == first.id));

        let all: PermitListEnvelope = server
            .get("/api/permits/all")
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .json();
        assert_eq!(all.permits.len(), 3);

        let missing = server
            .get("/api/permits/all-by-user-id")
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        missing.assert_status(StatusCode::BAD_REQUEST);
        missing.assert_json(&json!({"message": "userId is required as a query parameter!"}));
    }

    #[test_log::test(tokio::test)]
    async fn test_permit_ownership() {
        let (server, store) = create_test_app().await;
        let owner = create_test_resident(&store, StandType::Residential).await;
        let other = create_test_resident(&store, StandType::Residential).await;
        let owner_headers = add_auth_headers(&owner);
        let other_headers = add_auth_headers(&other);

        server
            .post("/api/permits/add")
            .add_header(&other_headers[0].0, &other_headers[0].1)
            .json(&permit_body(owner.id))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let created: PermitEnvelope = server
            .post("/api/permits/add")
            .add_header(&owner_headers[0].0, &owner_headers[0].1)
            .json(&permit_body(owner.id))
            .await
            .json();

        server
            .delete(&format!("/api/permits/delete/{}", created.permit.id))
            .add_header(&other_headers[0].0, &other_headers[0].1)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format!("/api/permits/delete/{}", created.permit.id))
            .add_header(&owner_headers[0].0, &owner_headers[0].1)
            .await
            .assert_status_ok();
        server
            .delete(&format!("/api/permits/delete/{}", created.permit.id))
            .add_header(&owner_headers[0].0, &owner_headers[0].1)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_create_permit_requires_fields() {
        let (server, store) = create_test_app().await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        let response = server
            .post("/api/permits/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"userId": resident.id, "permitType": "Building"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "All fields are required!"}));
    }
}
