use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiPath},
        models::{
            MessageResponse, required, required_text,
            schedules::{ScheduleEnvelope, ScheduleListEnvelope, ScheduleRequest, ScheduleResponse},
            users::CurrentUser,
        },
    },
    auth::current_user::require_staff,
    db::models::schedules::ScheduleDBRequest,
    errors::{Error, Result},
    types::{Operation, Resource, ScheduleId},
};
use axum::{Json, extract::State, http::StatusCode};

impl TryFrom<ScheduleRequest> for ScheduleDBRequest {
    type Error = Error;

    fn try_from(request: ScheduleRequest) -> Result<Self> {
        Ok(Self {
            service: required_text(request.service)?,
            date_time: required(request.date_time)?,
            location: required_text(request.location)?,
            frequency: required_text(request.frequency)?,
            status: required(request.status)?,
            description: required_text(request.description)?,
        })
    }
}

/// Publish a service schedule
#[utoipa::path(
    post,
    path = "/api/service-schedules/add",
    request_body = ScheduleRequest,
    tag = "service-schedules",
    responses(
        (status = 201, description = "Service schedule created", body = ScheduleEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Staff only"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_schedule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleEnvelope>)> {
    require_staff(&current_user, Operation::Create, Resource::Schedules)?;

    let schedule = state.store.create_schedule(&ScheduleDBRequest::try_from(request)?).await?;

    Ok((
        StatusCode::CREATED,
        Json(ScheduleEnvelope {
            message: "Service schedule created successfully!".to_string(),
            schedule: ScheduleResponse::from(schedule),
        }),
    ))
}

/// List all service schedules, earliest first
#[utoipa::path(
    get,
    path = "/api/service-schedules/all",
    tag = "service-schedules",
    responses(
        (status = 200, description = "All service schedules", body = ScheduleListEnvelope),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_schedules(State(state): State<AppState>, _: CurrentUser) -> Result<Json<ScheduleListEnvelope>> {
    let schedules = state.store.list_schedules().await?;

    Ok(Json(ScheduleListEnvelope {
        message: "Success fetching all service schedules!".to_string(),
        schedules: schedules.into_iter().map(ScheduleResponse::from).collect(),
    }))
}

/// Get a service schedule
#[utoipa::path(
    get,
    path = "/api/service-schedules/get/{id}",
    tag = "service-schedules",
    params(("id" = uuid::Uuid, Path, description = "Service schedule ID")),
    responses(
        (status = 200, description = "Service schedule", body = ScheduleEnvelope),
        (status = 404, description = "Service schedule not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_schedule(
    State(state): State<AppState>,
    _: CurrentUser,
    ApiPath(id): ApiPath<ScheduleId>,
) -> Result<Json<ScheduleEnvelope>> {
    let schedule = state
        .store
        .get_schedule(id)
        .await?
        .ok_or_else(|| Error::not_found("Service schedule", id))?;

    Ok(Json(ScheduleEnvelope {
        message: "Success fetching service schedule!".to_string(),
        schedule: ScheduleResponse::from(schedule),
    }))
}

/// Replace a service schedule
#[utoipa::path(
    put,
    path = "/api/service-schedules/update/{id}",
    request_body = ScheduleRequest,
    tag = "service-schedules",
    params(("id" = uuid::Uuid, Path, description = "Service schedule ID")),
    responses(
        (status = 200, description = "Service schedule updated", body = ScheduleEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Service schedule not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_schedule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<ScheduleId>,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> Result<Json<ScheduleEnvelope>> {
    require_staff(&current_user, Operation::Update, Resource::Schedules)?;

    if state.store.get_schedule(id).await?.is_none() {
        return Err(Error::not_found("Service schedule", id));
    }
    let schedule = state.store.update_schedule(id, &ScheduleDBRequest::try_from(request)?).await?;

    Ok(Json(ScheduleEnvelope {
        message: "Service schedule updated successfully!".to_string(),
        schedule: ScheduleResponse::from(schedule),
    }))
}

/// Delete a service schedule
#[utoipa::path(
    delete,
    path = "/api/service-schedules/delete/{id}",
    tag = "service-schedules",
    params(("id" = uuid::Uuid, Path, description = "Service schedule ID")),
    responses(
        (status = 200, description = "Service schedule deleted", body = MessageResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Service schedule not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_schedule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<ScheduleId>,
) -> Result<Json<MessageResponse>> {
    require_staff(&current_user, Operation::Delete, Resource::Schedules)?;

    if state.store.get_schedule(id).await?.is_none() || !state.store.delete_schedule(id).await? {
        return Err(Error::not_found("Service schedule", id));
    }

    Ok(Json(MessageResponse::new("Service schedule deleted successfully!")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            schedules::{ScheduleEnvelope, ScheduleListEnvelope, ScheduleStatus},
            users::StandType,
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;

    fn schedule_body(date_time: &str) -> serde_json::Value {
        json!({
            "Service": "Refuse collection",
            "Date_Time": date_time,
            "Location": "Ward 7",
            "Frequency": "Weekly",
            "Status": "scheduled",
            "description": "Bins out by 7am"
        })
    }

    #[test_log::test(tokio::test)]
    async fn test_schedule_lifecycle() {
        let (server, store) = create_test_app().await;
        let staff = create_test_staff(&store).await;
        let headers = add_auth_headers(&staff);

        let response = server
            .post("/api/service-schedules/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&schedule_body("2026-11-02T07:00:00Z"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let raw: serde_json::Value = response.json();
        assert_eq!(raw["schedule"]["Service"], "Refuse collection");
        assert_eq!(raw["schedule"]["Status"], "SCHEDULED");
        let created: ScheduleEnvelope = response.json();

        let mut body = schedule_body("2026-11-09T07:00:00Z");
        body["Status"] = json!("cancelled");
        let updated = server
            .put(&format!("/api/service-schedules/update/{}", created.schedule.id))
            .add_header(&headers[0].0, &headers[0].1)
            .json(&body)
            .await;
        updated.assert_status_ok();
        let updated: ScheduleEnvelope = updated.json();
        assert_eq!(updated.schedule.status, ScheduleStatus::Cancelled);

        let listed = server
            .get("/api/service-schedules/all")
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        listed.assert_status_ok();
        let listed: ScheduleListEnvelope = listed.json();
        assert_eq!(listed.schedules.len(), 1);

        server
            .delete(&format!("/api/service-schedules/delete/{}", created.schedule.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status_ok();
        server
            .get(&format!("/api/service-schedules/get/{}", created.schedule.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_schedule_requires_every_field_and_staff() {
        let (server, store) = create_test_app().await;
        let staff = create_test_staff(&store).await;
        let headers = add_auth_headers(&staff);

        let mut body = schedule_body("2026-11-02T07:00:00Z");
        body.as_object_mut().unwrap().remove("Frequency");
        let response = server
            .post("/api/service-schedules/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "All fields are required!"}));

        let resident = create_test_resident(&store, StandType::Residential).await;
        let resident_headers = add_auth_headers(&resident);
        server
            .post("/api/service-schedules/add")
            .add_header(&resident_headers[0].0, &resident_headers[0].1)
            .json(&schedule_body("2026-11-02T07:00:00Z"))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
