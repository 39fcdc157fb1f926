use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiPath},
        models::{
            MessageResponse,
            notifications::{
                NotificationCreate, NotificationEnvelope, NotificationListEnvelope, NotificationResponse, NotificationStatus, NotificationUpdate,
            },
            optional_text, required_text,
            users::CurrentUser,
        },
    },
    auth::current_user::{require_owner_or_staff, require_staff},
    db::models::notifications::{NotificationCreateDBRequest, NotificationFilter, NotificationUpdateDBRequest},
    errors::{Error, Result},
    types::{NotificationId, Operation, Resource},
};
use axum::{Json, extract::State, http::StatusCode};

fn user_and_message_required() -> Error {
    Error::BadRequest {
        message: "User ID and message are required!".to_string(),
    }
}

/// Send a notification to a user
#[utoipa::path(
    post,
    path = "/api/notifications/add",
    request_body = NotificationCreate,
    tag = "notifications",
    responses(
        (status = 201, description = "Notification created", body = NotificationEnvelope),
        (status = 400, description = "Missing user or message"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<NotificationCreate>,
) -> Result<(StatusCode, Json<NotificationEnvelope>)> {
    require_staff(&current_user, Operation::Create, Resource::Notifications)?;

    let user_id = request.user_id.ok_or_else(user_and_message_required)?;
    let message = optional_text(request.message).ok_or_else(user_and_message_required)?;

    if state.store.get_user(user_id).await?.is_none() {
        return Err(Error::not_found("User", user_id));
    }

    let notification = state
        .store
        .create_notification(&NotificationCreateDBRequest {
            user_id,
            message,
            status: request.status.unwrap_or(NotificationStatus::Unread),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(NotificationEnvelope {
            message: "Notification created successfully!".to_string(),
            notification: NotificationResponse::from(notification),
        }),
    ))
}

/// List notifications. Staff see every notification, residents only their own.
#[utoipa::path(
    get,
    path = "/api/notifications/all",
    tag = "notifications",
    responses(
        (status = 200, description = "Notifications", body = NotificationListEnvelope),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_notifications(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<NotificationListEnvelope>> {
    let filter = NotificationFilter {
        user_id: (!current_user.is_staff()).then_some(current_user.id),
    };
    let notifications = state.store.list_notifications(&filter).await?;

    Ok(Json(NotificationListEnvelope {
        message: "Success fetching all notifications!".to_string(),
        notifications: notifications.into_iter().map(NotificationResponse::from).collect(),
    }))
}

/// Get a notification
#[utoipa::path(
    get,
    path = "/api/notifications/get/{id}",
    tag = "notifications",
    params(("id" = uuid::Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification", body = NotificationEnvelope),
        (status = 403, description = "Another user's notification"),
        (status = 404, description = "Notification not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<Json<NotificationEnvelope>> {
    let notification = state
        .store
        .get_notification(id)
        .await?
        .ok_or_else(|| Error::not_found("Notification", id))?;
    require_owner_or_staff(&current_user, notification.user_id, Operation::Read, Resource::Notifications)?;

    Ok(Json(NotificationEnvelope {
        message: "Success fetching notification!".to_string(),
        notification: NotificationResponse::from(notification),
    }))
}

/// Update a notification, e.g. mark it as read
#[utoipa::path(
    put,
    path = "/api/notifications/update/{id}",
    request_body = NotificationUpdate,
    tag = "notifications",
    params(("id" = uuid::Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification updated", body = NotificationEnvelope),
        (status = 403, description = "Another user's notification"),
        (status = 404, description = "Notification not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<NotificationId>,
    ApiJson(request): ApiJson<NotificationUpdate>,
) -> Result<Json<NotificationEnvelope>> {
    let existing = state
        .store
        .get_notification(id)
        .await?
        .ok_or_else(|| Error::not_found("Notification", id))?;
    require_owner_or_staff(&current_user, existing.user_id, Operation::Update, Resource::Notifications)?;

    // Recipients may only change the read state; rewording is for staff
    let message = match request.message {
        Some(message) => required_text(Some(message))?,
        None => existing.message.clone(),
    };
    if message != existing.message {
        require_staff(&current_user, Operation::Update, Resource::Notifications)?;
    }

    let notification = state
        .store
        .update_notification(
            id,
            &NotificationUpdateDBRequest {
                message,
                status: request.status.unwrap_or(existing.status),
            },
        )
        .await?;

    Ok(Json(NotificationEnvelope {
        message: "Notification updated successfully!".to_string(),
        notification: NotificationResponse::from(notification),
    }))
}

/// Delete a notification
#[utoipa::path(
    delete,
    path = "/api/notifications/delete/{id}",
    tag = "notifications",
    params(("id" = uuid::Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification deleted", body = MessageResponse),
        (status = 403, description = "Another user's notification"),
        (status = 404, description = "Notification not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<Json<MessageResponse>> {
    let existing = state
        .store
        .get_notification(id)
        .await?
        .ok_or_else(|| Error::not_found("Notification", id))?;
    require_owner_or_staff(&current_user, existing.user_id, Operation::Delete, Resource::Notifications)?;

    if !state.store.delete_notification(id).await? {
        return Err(Error::not_found("Notification", id));
    }

    Ok(Json(MessageResponse::new("Notification deleted successfully!")))
}
