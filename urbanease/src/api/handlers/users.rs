use crate::{
    AppState,
    api::{
        extract::{ApiJson, ApiPath},
        models::{
            MessageResponse, optional_text, required, required_text,
            users::{CurrentUser, StandType, UserCreate, UserDeleteRequest, UserEnvelope, UserListEnvelope, UserResponse, UserUpdate},
        },
    },
    auth::{current_user::require_staff, password},
    db::models::users::{UserCreateDBRequest, UserFilter, UserUpdateDBRequest},
    errors::{Error, Result},
    types::{Operation, Resource, UserId},
};
use axum::{Json, extract::State, http::StatusCode};

fn check_email(email: &str) -> Result<()> {
    if email.contains('@') {
        Ok(())
    } else {
        Err(Error::BadRequest {
            message: "Invalid email address".to_string(),
        })
    }
}

async fn hash_new_password(state: &AppState, plain: String) -> Result<String> {
    let config = &state.config.auth.native.password;
    password::validate_length(&plain, config)?;
    password::hash_password(plain, password::Argon2Params::from(config)).await
}

async fn remove_user(state: &AppState, id: UserId) -> Result<()> {
    if id == state.treasury_account {
        return Err(Error::BadRequest {
            message: "The treasury account cannot be deleted".to_string(),
        });
    }
    if state.store.get_user(id).await?.is_none() {
        return Err(Error::not_found("User", id));
    }
    if !state.store.delete_user(id).await? {
        return Err(Error::not_found("User", id));
    }
    Ok(())
}

/// Create a user account
#[utoipa::path(
    post,
    path = "/api/users/add",
    request_body = UserCreate,
    tag = "users",
    responses(
        (status = 201, description = "User created", body = UserEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Email already in use"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<UserCreate>,
) -> Result<(StatusCode, Json<UserEnvelope>)> {
    require_staff(&current_user, Operation::Create, Resource::Users)?;

    let name = required_text(request.name)?;
    let email = required_text(request.email)?;
    let phone = required_text(request.phone)?;
    let plain_password = required(request.password.filter(|p| !p.is_empty()))?;
    let role = required(request.role)?;
    check_email(&email)?;

    let password_hash = hash_new_password(&state, plain_password).await?;
    let user = state
        .store
        .create_user(&UserCreateDBRequest {
            name,
            email,
            password_hash: Some(password_hash),
            role,
            phone: Some(phone),
            address: optional_text(request.address),
            stand_type: request.stand_type.unwrap_or(StandType::Residential),
            auth_source: "native".to_string(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            message: "User created successfully!".to_string(),
            user: UserResponse::from(user),
        }),
    ))
}

/// List all users
#[utoipa::path(
    get,
    path = "/api/users/all",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = UserListEnvelope),
        (status = 401, description = "Unauthorized"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, _: CurrentUser) -> Result<Json<UserListEnvelope>> {
    let users = state.store.list_users(&UserFilter::default()).await?;

    Ok(Json(UserListEnvelope {
        message: "Success fetching all users!".to_string(),
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/users/get/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserEnvelope),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(State(state): State<AppState>, _: CurrentUser, ApiPath(id): ApiPath<UserId>) -> Result<Json<UserEnvelope>> {
    let user = state.store.get_user(id).await?.ok_or_else(|| Error::not_found("User", id))?;

    Ok(Json(UserEnvelope {
        message: "Success fetching user!".to_string(),
        user: UserResponse::from(user),
    }))
}

/// Replace a user's details. A supplied password is re-hashed.
#[utoipa::path(
    put,
    path = "/api/users/update/{id}",
    request_body = UserUpdate,
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated", body = UserEnvelope),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(request): ApiJson<UserUpdate>,
) -> Result<Json<UserEnvelope>> {
    require_staff(&current_user, Operation::Update, Resource::Users)?;

    let existing = state.store.get_user(id).await?.ok_or_else(|| Error::not_found("User", id))?;

    let name = required_text(request.name)?;
    let email = required_text(request.email)?;
    let phone = required_text(request.phone)?;
    let role = required(request.role)?;
    check_email(&email)?;

    let password_hash = match request.password.filter(|p| !p.is_empty()) {
        Some(plain) => Some(hash_new_password(&state, plain).await?),
        None => None,
    };

    let user = state
        .store
        .update_user(
            id,
            &UserUpdateDBRequest {
                name,
                email,
                role,
                phone: Some(phone),
                address: optional_text(request.address),
                stand_type: request.stand_type.unwrap_or(existing.stand_type),
                password_hash,
            },
        )
        .await?;

    Ok(Json(UserEnvelope {
        message: "User updated successfully!".to_string(),
        user: UserResponse::from(user),
    }))
}

/// Delete a user by id
#[utoipa::path(
    delete,
    path = "/api/users/delete/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "The user still owns records, or is the treasury account"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<MessageResponse>> {
    require_staff(&current_user, Operation::Delete, Resource::Users)?;
    remove_user(&state, id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully!")))
}

/// Delete a user named in the request body (older clients)
#[utoipa::path(
    delete,
    path = "/api/users/delete",
    request_body = UserDeleteRequest,
    tag = "users",
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Missing id"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user_by_body(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<UserDeleteRequest>,
) -> Result<Json<MessageResponse>> {
    require_staff(&current_user, Operation::Delete, Resource::Users)?;
    let id = request.id.ok_or_else(|| Error::BadRequest {
        message: "User ID is required!".to_string(),
    })?;
    remove_user(&state, id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully!")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::users::{Role, StandType, UserEnvelope, UserListEnvelope},
        db::{
            Store,
            models::bills::BillCreateDBRequest,
        },
        test_utils::*,
    };
    use crate::api::models::bills::BillStatus;
    use axum::http::StatusCode;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;
    use uuid::Uuid;

    #[test_log::test(tokio::test)]
    async fn test_create_and_fetch_user() {
        let (server, store) = create_test_app().await;
        let admin = get_admin_user(&store).await;
        let headers = add_auth_headers(&admin);

        let response = server
            .post("/api/users/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({
                "name": "Chipo",
                "email": "chipo@example.com",
                "phone": "+263 77 123 4567",
                "password": "password123",
                "role": "resident",
                "standType": "commercial"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: UserEnvelope = response.json();
        assert_eq!(created.message, "User created successfully!");
        assert_eq!(created.user.stand_type, StandType::Commercial);
        assert_eq!(created.user.role, Role::Resident);
        let raw: serde_json::Value = response.json();
        assert!(raw["user"].get("passwordHash").is_none());
        assert!(raw["user"].get("password").is_none());

        let fetched = server
            .get(&format!("/api/users/get/{}", created.user.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        fetched.assert_status_ok();
        let fetched: UserEnvelope = fetched.json();
        assert_eq!(fetched.user.email, "chipo@example.com");

        let all = server.get("/api/users/all").add_header(&headers[0].0, &headers[0].1).await;
        all.assert_status_ok();
        let all: UserListEnvelope = all.json();
        assert_eq!(all.users.len(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_create_user_validation() {
        let (server, store) = create_test_app().await;
        let admin = get_admin_user(&store).await;
        let headers = add_auth_headers(&admin);

        let missing = server
            .post("/api/users/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"name": "Chipo", "email": "chipo@example.com"}))
            .await;
        missing.assert_status(StatusCode::BAD_REQUEST);
        missing.assert_json(&json!({"message": "All fields are required!"}));

        let bad_role = server
            .post("/api/users/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"name": "C", "email": "c@example.com", "phone": "1", "password": "password123", "role": "MAYOR"}))
            .await;
        bad_role.assert_status(StatusCode::BAD_REQUEST);

        let body = json!({"name": "C", "email": "c@example.com", "phone": "1", "password": "password123", "role": "RESIDENT"});
        server
            .post("/api/users/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
        let duplicate = server
            .post("/api/users/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&body)
            .await;
        duplicate.assert_status(StatusCode::CONFLICT);
    }

    #[test_log::test(tokio::test)]
    async fn test_residents_cannot_manage_users() {
        let (server, store) = create_test_app().await;
        let resident = create_test_resident(&store, StandType::Residential).await;
        let headers = add_auth_headers(&resident);

        let response = server
            .post("/api/users/add")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"name": "C", "email": "c@example.com", "phone": "1", "password": "password123", "role": "ADMIN"}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server
            .delete(&format!("/api/users/delete/{}", resident.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        // Reads are open to any signed-in user
        server
            .get("/api/users/all")
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_update_user_replaces_fields() {
        let (server, store) = create_test_app().await;
        let admin = get_admin_user(&store).await;
        let headers = add_auth_headers(&admin);
        let resident = create_test_resident(&store, StandType::Other).await;

        let response = server
            .put(&format!("/api/users/update/{}", resident.id))
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({
                "name": "Renamed",
                "email": resident.email,
                "phone": "+263 71 000 0000",
                "role": "MUNICIPAL_STAFF",
                "password": "new-password-1"
            }))
            .await;
        response.assert_status_ok();
        let updated: UserEnvelope = response.json();
        assert_eq!(updated.user.name, "Renamed");
        assert_eq!(updated.user.role, Role::MunicipalStaff);
        assert_eq!(updated.user.stand_type, StandType::Other);
        assert_eq!(updated.user.address, None);

        let stored = store.get_user(resident.id).await.unwrap().unwrap();
        assert!(stored.password_hash.is_some());

        let missing = server
            .put(&format!("/api/users/update/{}", Uuid::new_v4()))
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"name": "X", "email": "x@example.com", "phone": "1", "role": "RESIDENT"}))
            .await;
        missing.assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_user_variants() {
        let (server, store) = create_test_app().await;
        let admin = get_admin_user(&store).await;
        let headers = add_auth_headers(&admin);

        let first = create_test_resident(&store, StandType::Residential).await;
        server
            .delete(&format!("/api/users/delete/{}", first.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status_ok();
        assert!(store.get_user(first.id).await.unwrap().is_none());

        server
            .delete(&format!("/api/users/delete/{}", first.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // Legacy body variant
        let second = create_test_resident(&store, StandType::Residential).await;
        let missing_id = server
            .delete("/api/users/delete")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({}))
            .await;
        missing_id.assert_status(StatusCode::BAD_REQUEST);
        missing_id.assert_json(&json!({"message": "User ID is required!"}));

        server
            .delete("/api/users/delete")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"id": Uuid::new_v4()}))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .delete("/api/users/delete")
            .add_header(&headers[0].0, &headers[0].1)
            .json(&json!({"id": second.id}))
            .await
            .assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_user_with_bills_or_treasury_is_rejected() {
        let (server, store) = create_test_app().await;
        let admin = get_admin_user(&store).await;
        let headers = add_auth_headers(&admin);
        let resident = create_test_resident(&store, StandType::Residential).await;
        store
            .create_bill(&BillCreateDBRequest {
                user_id: resident.id,
                bill_type: "Water".to_string(),
                amount: Decimal::from(30),
                due_date: Utc::now(),
                status: BillStatus::Pending,
            })
            .await
            .unwrap();

        let response = server
            .delete(&format!("/api/users/delete/{}", resident.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "Invalid reference to related resource"}));

        let response = server
            .delete(&format!("/api/users/delete/{}", admin.id))
            .add_header(&headers[0].0, &headers[0].1)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
