use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiPath},
        models::{
            MessageResponse,
            admin_logs::{AdminLogCreate, AdminLogEnvelope, AdminLogListEnvelope, AdminLogResponse, AdminLogUpdate},
            optional_text, required_text,
            users::CurrentUser,
        },
    },
    auth::current_user::require_staff,
    db::models::admin_logs::{AdminLogCreateDBRequest, AdminLogUpdateDBRequest},
    errors::{Error, Result},
    types::{AdminLogId, Operation, Resource},
};
use axum::{Json, extract::State, http::StatusCode};

/// Record an administrative action
#[utoipa::path(
    post,
    path = "/api/admin-log/add",
    request_body = AdminLogCreate,
    tag = "admin-log",
    responses(
        (status = 201, description = "Admin log created", body = AdminLogEnvelope),
        (status = 400, description = "Missing admin id or action"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Admin not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_admin_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<AdminLogCreate>,
) -> Result<(StatusCode, Json<AdminLogEnvelope>)> {
    require_staff(&current_user, Operation::Create, Resource::AdminLogs)?;

    let (Some(admin_id), Some(action)) = (request.admin_id, optional_text(request.action)) else {
        return Err(Error::BadRequest {
            message: "Admin ID and action are required!".to_string(),
        });
    };

    if state.store.get_user(admin_id).await?.is_none() {
        return Err(Error::not_found("User", admin_id));
    }

    let log = state.store.create_admin_log(&AdminLogCreateDBRequest { admin_id, action }).await?;

    Ok((
        StatusCode::CREATED,
        Json(AdminLogEnvelope {
            message: "Admin log created successfully!".to_string(),
            admin_log: AdminLogResponse::from(log),
        }),
    ))
}

/// List the audit log, newest first
#[utoipa::path(
    get,
    path = "/api/admin-log/all",
    tag = "admin-log",
    responses(
        (status = 200, description = "All admin logs", body = AdminLogListEnvelope),
        (status = 403, description = "Staff only"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_admin_logs(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<AdminLogListEnvelope>> {
    require_staff(&current_user, Operation::Read, Resource::AdminLogs)?;

    let logs = state.store.list_admin_logs().await?;

    Ok(Json(AdminLogListEnvelope {
        message: "Success fetching all admin logs!".to_string(),
        admin_logs: logs.into_iter().map(AdminLogResponse::from).collect(),
    }))
}

/// Get an audit log entry
#[utoipa::path(
    get,
    path = "/api/admin-log/get/{id}",
    tag = "admin-log",
    params(("id" = uuid::Uuid, Path, description = "Admin log ID")),
    responses(
        (status = 200, description = "Admin log", body = AdminLogEnvelope),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Admin log not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_admin_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<AdminLogId>,
) -> Result<Json<AdminLogEnvelope>> {
    require_staff(&current_user, Operation::Read, Resource::AdminLogs)?;

    let log = state.store.get_admin_log(id).await?.ok_or_else(|| Error::not_found("Admin log", id))?;

    Ok(Json(AdminLogEnvelope {
        message: "Success fetching admin log!".to_string(),
        admin_log: AdminLogResponse::from(log),
    }))
}

/// Reword an audit log entry
#[utoipa::path(
    put,
    path = "/api/admin-log/update/{id}",
    request_body = AdminLogUpdate,
    tag = "admin-log",
    params(("id" = uuid::Uuid, Path, description = "Admin log ID")),
    responses(
        (status = 200, description = "Admin log updated", body = AdminLogEnvelope),
        (status = 400, description = "Missing action"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Admin log not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_admin_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<AdminLogId>,
    ApiJson(request): ApiJson<AdminLogUpdate>,
) -> Result<Json<AdminLogEnvelope>> {
    require_staff(&current_user, Operation::Update, Resource::AdminLogs)?;

    if state.store.get_admin_log(id).await?.is_none() {
        return Err(Error::not_found("Admin log", id));
    }
    let action = required_text(request.action)?;
    let log = state.store.update_admin_log(id, &AdminLogUpdateDBRequest { action }).await?;

    Ok(Json(AdminLogEnvelope {
        message: "Admin log updated successfully!".to_string(),
        admin_log: AdminLogResponse::from(log),
    }))
}

/// Delete an audit log entry
#[utoipa::path(
    delete,
    path = "/api/admin-log/delete/{id}",
    tag = "admin-log",
    params(("id" = uuid::Uuid, Path, description = "Admin log ID")),
    responses(
        (status = 200, description = "Admin log deleted", body = MessageResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Admin log not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_admin_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<AdminLogId>,
) -> Result<Json<MessageResponse>> {
    require_staff(&current_user, Operation::Delete, Resource::AdminLogs)?;

    if state.store.get_admin_log(id).await?.is_none() || !state.store.delete_admin_log(id).await? {
        return Err(Error::not_found("Admin log", id));
    }

    Ok(Json(MessageResponse::new("Admin log deleted successfully!")))
}
