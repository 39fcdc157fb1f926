use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        extract::ApiJson,
        models::{
            auth::{AuthResponse, AuthSuccessResponse, LoginRequest, LoginResponse, LogoutResponse, SignupRequest},
            required_text,
            users::{CurrentUser, Role, StandType, UserResponse},
        },
    },
    auth::{password, session},
    db::{errors::DbError, models::users::UserCreateDBRequest},
    errors::Error,
    metrics,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const ACCOUNT_EXISTS: &str = "User Account exists!";

fn invalid_credentials() -> Error {
    metrics::record_auth_event("login_failure");
    Error::Unauthenticated {
        message: Some(INVALID_CREDENTIALS.to_string()),
    }
}

/// Create a resident account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing fields, weak password, privileged role or existing account"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signup(State(state): State<AppState>, ApiJson(request): ApiJson<SignupRequest>) -> Result<Json<AuthResponse>, Error> {
    let native = &state.config.auth.native;
    if !native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }
    if !native.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let username = required_text(request.username)?;
    let email = required_text(request.email)?;
    let plain_password = request.password.filter(|p| !p.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "All fields are required!".to_string(),
    })?;

    if !email.contains('@') {
        return Err(Error::BadRequest {
            message: "Invalid email address".to_string(),
        });
    }
    if let Some(role) = request.role
        && role != Role::Resident
    {
        return Err(Error::BadRequest {
            message: format!("Self sign-up cannot request the {role} role"),
        });
    }
    password::validate_length(&plain_password, &native.password)?;

    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(Error::BadRequest {
            message: ACCOUNT_EXISTS.to_string(),
        });
    }

    let password_hash = password::hash_password(plain_password, password::Argon2Params::from(&native.password)).await?;
    let create_request = UserCreateDBRequest {
        name: username,
        email,
        password_hash: Some(password_hash),
        role: Role::Resident,
        phone: None,
        address: None,
        stand_type: StandType::Residential,
        auth_source: "native".to_string(),
    };

    // A concurrent sign-up for the same email loses on the unique constraint
    let created = state.store.create_user(&create_request).await.map_err(|e| match e {
        DbError::UniqueViolation { .. } => Error::BadRequest {
            message: ACCOUNT_EXISTS.to_string(),
        },
        other => other.into(),
    })?;

    metrics::record_auth_event("signup");
    Ok(Json(AuthResponse {
        message: "Account created successfully".to_string(),
        user: UserResponse::from(created),
    }))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful; the session cookie is set", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, ApiJson(request): ApiJson<LoginRequest>) -> Result<LoginResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let email = required_text(request.email)?;
    let plain_password = request.password.filter(|p| !p.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "All fields are required!".to_string(),
    })?;

    let user = state.store.get_user_by_email(&email).await?.ok_or_else(invalid_credentials)?;

    // Proxy-provisioned and system accounts without a password cannot log in natively
    let hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;
    if !password::verify_password(plain_password, hash).await? {
        return Err(invalid_credentials());
    }

    let current_user = CurrentUser::from(user.clone());
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = session::session_cookie(&token, &state.config);

    metrics::record_auth_event("login_success");
    Ok(LoginResponse {
        auth_response: AuthResponse {
            message: "Login successful".to_string(),
            user: UserResponse::from(user),
        },
        cookie,
    })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: session::clear_session_cookie(&state.config),
    })
}

/// The signed-in user, read fresh from storage
#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "authentication",
    responses(
        (status = 200, description = "Current session user", body = CurrentUser),
        (status = 401, description = "Not signed in"),
    ),
    security(("CookieAuth" = []), ("ProxyHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_session(current_user: CurrentUser) -> Result<Json<CurrentUser>, Error> {
    Ok(Json(current_user))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            auth::AuthResponse,
            users::{CurrentUser, Role},
        },
        db::Store,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;

    fn session_pair(response: &axum_test::TestResponse) -> String {
        let set_cookie = response
            .headers()
            .get("set-cookie")
            .expect("login should set a cookie")
            .to_str()
            .unwrap()
            .to_string();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test_log::test(tokio::test)]
    async fn test_signup_creates_resident() {
        let (server, store) = create_test_app().await;

        let response = server
            .post("/api/auth/signup")
            .json(&json!({"username": "Rudo", "email": "rudo@example.com", "password": "password123"}))
            .await;

        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").is_none());
        let body: AuthResponse = response.json();
        assert_eq!(body.message, "Account created successfully");
        assert_eq!(body.user.role, Role::Resident);

        let stored = store.get_user_by_email("rudo@example.com").await.unwrap().unwrap();
        assert!(stored.password_hash.unwrap().starts_with("$argon2id$"));
        assert_eq!(stored.auth_source, "native");
    }

    #[test_log::test(tokio::test)]
    async fn test_signup_rejects_duplicates_and_bad_input() {
        let (server, _store) = create_test_app().await;
        let body = json!({"username": "Rudo", "email": "rudo@example.com", "password": "password123"});
        server.post("/api/auth/signup").json(&body).await.assert_status_ok();

        let duplicate = server
            .post("/api/auth/signup")
            .json(&json!({"username": "Other", "email": "RUDO@example.com", "password": "password123"}))
            .await;
        duplicate.assert_status(StatusCode::BAD_REQUEST);
        duplicate.assert_json(&json!({"message": "User Account exists!"}));

        let short = server
            .post("/api/auth/signup")
            .json(&json!({"username": "Tino", "email": "tino@example.com", "password": "short"}))
            .await;
        short.assert_status(StatusCode::BAD_REQUEST);

        let privileged = server
            .post("/api/auth/signup")
            .json(&json!({"username": "Tino", "email": "tino@example.com", "password": "password123", "role": "ADMIN"}))
            .await;
        privileged.assert_status(StatusCode::BAD_REQUEST);

        let missing = server.post("/api/auth/signup").json(&json!({"email": "tino@example.com"})).await;
        missing.assert_status(StatusCode::BAD_REQUEST);
        missing.assert_json(&json!({"message": "All fields are required!"}));
    }

    #[test_log::test(tokio::test)]
    async fn test_login_session_and_logout() {
        let (server, _store) = create_test_app().await;
        server
            .post("/api/auth/signup")
            .json(&json!({"username": "Rudo", "email": "rudo@example.com", "password": "password123"}))
            .await
            .assert_status_ok();

        let login = server
            .post("/api/auth/login")
            .json(&json!({"email": "rudo@example.com", "password": "password123"}))
            .await;
        login.assert_status_ok();
        let set_cookie = login.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = session_pair(&login);

        let session = server.get("/api/auth/session").add_header("cookie", cookie.as_str()).await;
        session.assert_status_ok();
        let current: CurrentUser = session.json();
        assert_eq!(current.email, "rudo@example.com");
        assert_eq!(current.username, "Rudo");
        assert_eq!(current.role, Role::Resident);

        let logout = server.post("/api/auth/logout").await;
        logout.assert_status_ok();
        let cleared = logout.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test_log::test(tokio::test)]
    async fn test_login_rejects_bad_credentials() {
        let (server, _store) = create_test_app().await;
        server
            .post("/api/auth/signup")
            .json(&json!({"username": "Rudo", "email": "rudo@example.com", "password": "password123"}))
            .await
            .assert_status_ok();

        let wrong = server
            .post("/api/auth/login")
            .json(&json!({"email": "rudo@example.com", "password": "not-the-password"}))
            .await;
        wrong.assert_status(StatusCode::UNAUTHORIZED);
        wrong.assert_json(&json!({"message": "Invalid email or password"}));

        let unknown = server
            .post("/api/auth/login")
            .json(&json!({"email": "nobody@example.com", "password": "password123"}))
            .await;
        unknown.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test_log::test(tokio::test)]
    async fn test_session_via_proxy_header() {
        let (server, store) = create_test_app().await;
        let clerk = create_test_staff(&store).await;
        let headers = add_auth_headers(&clerk);

        let response = server.get("/api/auth/session").add_header(&headers[0].0, &headers[0].1).await;
        response.assert_status_ok();
        let current: CurrentUser = response.json();
        assert_eq!(current.id, clerk.id);
        assert_eq!(current.role, Role::MunicipalStaff);
    }

    #[test_log::test(tokio::test)]
    async fn test_signup_disabled() {
        let mut config = create_test_config();
        config.auth.native.allow_registration = false;
        let store = crate::db::InMemoryStore::new();
        let app = crate::Application::with_store(config, std::sync::Arc::new(store)).await.unwrap();
        let server = app.into_test_server();

        let response = server
            .post("/api/auth/signup")
            .json(&json!({"username": "Rudo", "email": "rudo@example.com", "password": "password123"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
