use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiPath},
        models::{
            MessageResponse, optional_text, required_text,
            tickets::{TicketCreate, TicketEnvelope, TicketListEnvelope, TicketPriority, TicketResponse, TicketStatus, TicketUpdate},
            users::CurrentUser,
        },
    },
    auth::current_user::{require_owner_or_staff, require_staff},
    db::models::tickets::{TicketCreateDBRequest, TicketUpdateDBRequest},
    errors::{Error, Result},
    types::{Operation, Resource, TicketId},
};
use axum::{Json, extract::State, http::StatusCode};

const TICKET_FIELDS_REQUIRED: &str = "User ID, category, and description are required!";

fn ticket_fields_required() -> Error {
    Error::BadRequest {
        message: TICKET_FIELDS_REQUIRED.to_string(),
    }
}

/// Raise a service request. The `TKT-` id is allocated by the store.
#[utoipa::path(
    post,
    path = "/api/service-requests/add",
    request_body = TicketCreate,
    tag = "service-requests",
    responses(
        (status = 201, description = "Service request created", body = TicketEnvelope),
        (status = 400, description = "Missing user, category or description"),
        (status = 403, description = "Residents may only raise requests for themselves"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_ticket(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<TicketCreate>,
) -> Result<(StatusCode, Json<TicketEnvelope>)> {
    let user_id = request.user_id.ok_or_else(ticket_fields_required)?;
    let ticket_type = optional_text(request.ticket_type).ok_or_else(ticket_fields_required)?;
    let description = optional_text(request.description).ok_or_else(ticket_fields_required)?;
    require_owner_or_staff(&current_user, user_id, Operation::Create, Resource::Tickets)?;

    if state.store.get_user(user_id).await?.is_none() {
        return Err(Error::not_found("User", user_id));
    }

    let ticket = state
        .store
        .create_ticket(&TicketCreateDBRequest {
            user_id,
            ticket_type,
            location: optional_text(request.location),
            description,
            priority: request.priority.unwrap_or(TicketPriority::Medium),
            assigned_to: optional_text(request.assigned_to),
            status: request.status.unwrap_or(TicketStatus::Open),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TicketEnvelope {
            message: "Service request created successfully!".to_string(),
            ticket: TicketResponse::from(ticket),
        }),
    ))
}

/// List all service requests
#[utoipa::path(
    get,
    path = "/api/service-requests/all",
    tag = "service-requests",
    responses(
        (status = 200, description = "All service requests", body = TicketListEnvelope),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_tickets(State(state): State<AppState>, _: CurrentUser) -> Result<Json<TicketListEnvelope>> {
    let tickets = state.store.list_tickets().await?;

    Ok(Json(TicketListEnvelope {
        message: "Success fetching all service requests!".to_string(),
        tickets: tickets.into_iter().map(TicketResponse::from).collect(),
    }))
}

/// Get a service request
#[utoipa::path(
    get,
    path = "/api/service-requests/get/{id}",
    tag = "service-requests",
    params(("id" = uuid::Uuid, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Service request", body = TicketEnvelope),
        (status = 404, description = "Service request not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_ticket(State(state): State<AppState>, _: CurrentUser, ApiPath(id): ApiPath<TicketId>) -> Result<Json<TicketEnvelope>> {
    let ticket = state
        .store
        .get_ticket(id)
        .await?
        .ok_or_else(|| Error::not_found("Service request", id))?;

    Ok(Json(TicketEnvelope {
        message: "Success fetching service request!".to_string(),
        ticket: TicketResponse::from(ticket),
    }))
}

/// Replace a service request's details. Triage fields (priority, assignee, status) are staff only.
#[utoipa::path(
    put,
    path = "/api/service-requests/update/{id}",
    request_body = TicketUpdate,
    tag = "service-requests",
    params(("id" = uuid::Uuid, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Service request updated", body = TicketEnvelope),
        (status = 400, description = "Missing category or description"),
        (status = 403, description = "Not the requester, or a resident triaging"),
        (status = 404, description = "Service request not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_ticket(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<TicketId>,
    ApiJson(request): ApiJson<TicketUpdate>,
) -> Result<Json<TicketEnvelope>> {
    let existing = state
        .store
        .get_ticket(id)
        .await?
        .ok_or_else(|| Error::not_found("Service request", id))?;
    require_owner_or_staff(&current_user, existing.user_id, Operation::Update, Resource::Tickets)?;

    let update = TicketUpdateDBRequest {
        ticket_type: required_text(request.ticket_type)?,
        location: optional_text(request.location),
        description: required_text(request.description)?,
        priority: request.priority.unwrap_or(existing.priority),
        assigned_to: match request.assigned_to {
            Some(assignee) => optional_text(Some(assignee)),
            None => existing.assigned_to.clone(),
        },
        status: request.status.unwrap_or(existing.status),
    };
    if update.priority != existing.priority || update.status != existing.status || update.assigned_to != existing.assigned_to {
        require_staff(&current_user, Operation::Update, Resource::Tickets)?;
    }

    let ticket = state.store.update_ticket(id, &update).await?;

    Ok(Json(TicketEnvelope {
        message: "Service request updated successfully!".to_string(),
        ticket: TicketResponse::from(ticket),
    }))
}

/// Delete a service request
#[utoipa::path(
    delete,
    path = "/api/service-requests/delete/{id}",
    tag = "service-requests",
    params(("id" = uuid::Uuid, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Service request deleted", body = MessageResponse),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Service request not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_ticket(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<TicketId>,
) -> Result<Json<MessageResponse>> {
    let existing = state
        .store
        .get_ticket(id)
        .await?
        .ok_or_else(|| Error::not_found("Service request", id))?;
    require_owner_or_staff(&current_user, existing.user_id, Operation::Delete, Resource::Tickets)?;

    if !state.store.delete_ticket(id).await? {
        return Err(Error::not_found("Service request", id));
    }

    Ok(Json(MessageResponse::new("Service request deleted successfully!")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            tickets::{TicketEnvelope, TicketListEnvelope, TicketPriority, TicketStatus},
            users::StandType,
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_tickets_get_sequential_ids_and_defaults() {
        let (server, store) = create_test_app().await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        let mut ids = Vec::new();
        for description in ["Burst pipe on 5th street", "Streetlight out"] {
            let response = server
                .post("/api/service-requests/add")
                .add_header(&headers[0].0, &headers[0].1)
                .json(&json!({"userId": resident.id, "category": "Water", "description": description}))
                .await;
            response.assert_status(StatusCode::CREATED);
            let created: TicketEnvelope = response.json();
            assert_eq!(created.ticket.priority, TicketPriority::Medium);
            assert_eq!(created.ticket.status, TicketStatus::Open);
            ids.push(created.ticket.ticket_id);
        }
        assert_eq!(ids, vec!["TKT-001".to_string(), "TKT-002".to_string()]);

        let response = server
            .get("/api/service-requests/all")
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        response.assert_status_ok();
        let raw: serde_json::Value = response.json();
        assert_eq!(raw["serviceRequests"].as_array().map(Vec::len), Some(2));
        let listed: TicketListEnvelope = response.json();
        assert_eq!(listed.message, "Success fetching all service requests!");
    }

    #[test_log::test(tokio::test)]
    async fn test_ticket_requires_category_and_description() {
        let (server, store) = create_test_app().await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        let response = server
            .post("/api/service-requests/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"userId": resident.id, "type": "Roads"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "User ID, category, and description are required!"}));
    }

    #[test_log::test(tokio::test)]
    async fn test_only_staff_triage_tickets() {
        let (server, store) = create_test_app().await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        let created: TicketEnvelope = server
            .post("/api/service-requests/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"userId": resident.id, "type": "Roads", "description": "Pothole", "location": "Main Rd"}))
            .await
            .json();
        let url = format!("/api/service-requests/update/{}", created.ticket.id);

        // The requester may reword their request
        let reworded = server
            .put(&url)
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"type": "Roads", "description": "Large pothole", "location": "Main Rd"}))
            .await;
        reworded.assert_status_ok();
        let reworded: TicketEnvelope = reworded.json();
        assert_eq!(reworded.ticket.description, "Large pothole");

        server
            .put(&url)
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"type": "Roads", "description": "Large pothole", "status": "resolved"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let staff = create_test_staff(&store).await;
        let staff_headers = add_auth_headers(&staff);
        let triaged = server
            .put(&url)
            .add_header(&staff_headers[0].0, &staff_headers[0].1)
            .json(&json!({
                "type": "Roads",
                "description": "Large pothole",
                "location": "Main Rd",
                "priority": "high",
                "assignedTo": "Roads crew B",
                "status": "in progress"
            }))
            .await;
        triaged.assert_status_ok();
        let triaged: TicketEnvelope = triaged.json();
        assert_eq!(triaged.ticket.priority, TicketPriority::High);
        assert_eq!(triaged.ticket.status, TicketStatus::InProgress);
        assert_eq!(triaged.ticket.assigned_to.as_deref(), Some("Roads crew B"));
        assert_eq!(triaged.ticket.ticket_id, created.ticket.ticket_id);

        server
            .delete(&format!("/api/service-requests/delete/{}", created.ticket.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status_ok();
        server
            .get(&format!("/api/service-requests/get/{}", created.ticket.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
