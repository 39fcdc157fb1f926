use crate::{
    AppState,
    api::models::users::{CurrentUser, Role, StandType},
    auth::session,
    config::Config,
    db::{models::users::UserCreateDBRequest, store::Store},
    errors::{Error, Result},
    types::{Operation, Resource, UserId},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

/// Resolve the user behind a session cookie.
/// Returns:
/// - None: no session cookie, or the token is invalid or expired
/// - Some(Ok(user)): valid token for an account that still exists
/// - Some(Err(error)): the account lookup failed
#[instrument(skip_all)]
async fn try_jwt_session_auth(parts: &Parts, config: &Config, store: &dyn Store) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    let token = session::token_from_cookie_header(cookie_header, &config.auth.native.session.cookie_name)?;

    let claims = match session::verify_session_token(token, config) {
        Ok(claims) => claims,
        Err(e) => {
            trace!("Ignoring session cookie: {}", e);
            return None;
        }
    };

    // The token only identifies the account; role and address are read fresh.
    match store.get_user_by_email(&claims.email).await {
        Ok(Some(user)) => Some(Ok(CurrentUser::from(user))),
        Ok(None) => {
            debug!("Session token refers to a deleted account");
            None
        }
        Err(e) => Some(Err(e.into())),
    }
}

/// Resolve the user named by the trusted proxy header.
/// Returns:
/// - None: no header present, or unknown email with auto-creation disabled
/// - Some(Ok(user)): existing or freshly provisioned account
/// - Some(Err(error)): lookup or creation failed
#[instrument(skip_all)]
async fn try_proxy_header_auth(parts: &Parts, config: &Config, store: &dyn Store) -> Option<Result<CurrentUser>> {
    let proxy = &config.auth.proxy_header;
    let email = parts
        .headers
        .get(&proxy.header_name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())?;

    match store.get_user_by_email(email).await {
        Ok(Some(user)) => return Some(Ok(CurrentUser::from(user))),
        Ok(None) if !proxy.auto_create_users => return None,
        Ok(None) => {}
        Err(e) => return Some(Err(e.into())),
    }

    let name = parts
        .headers
        .get(&proxy.name_header_name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().filter(|s| !s.is_empty()).unwrap_or("resident").to_string());

    let request = UserCreateDBRequest {
        name,
        email: email.to_string(),
        password_hash: None,
        role: Role::Resident,
        phone: None,
        address: None,
        stand_type: StandType::Residential,
        auth_source: "proxy-header".to_string(),
    };

    // ensure_user tolerates two first requests for the same email racing each other
    match store.ensure_user(&request).await {
        Ok(user) => {
            debug!("Provisioned proxy header user {}", user.id);
            Some(Ok(CurrentUser::from(user)))
        }
        Err(e) => Some(Err(e.into())),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Session cookie first, then the proxy header
        if state.config.auth.native.enabled {
            match try_jwt_session_auth(parts, &state.config, state.store.as_ref()).await {
                Some(Ok(user)) => {
                    debug!("Found JWT session authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => return Err(e),
                None => trace!("No JWT session authentication attempted"),
            }
        }

        if state.config.auth.proxy_header.enabled {
            match try_proxy_header_auth(parts, &state.config, state.store.as_ref()).await {
                Some(Ok(user)) => {
                    debug!("Found proxy header authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => return Err(e),
                None => trace!("No proxy header authentication attempted"),
            }
        }

        Err(Error::Unauthenticated { message: None })
    }
}

/// Reject non-staff users attempting a staff-only operation.
pub fn require_staff(user: &CurrentUser, action: Operation, resource: Resource) -> Result<()> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions { action, resource })
    }
}

/// Residents may only act on records they own; staff may act on anyone's.
pub fn require_owner_or_staff(user: &CurrentUser, owner: UserId, action: Operation, resource: Resource) -> Result<()> {
    if user.is_staff() || user.id == owner {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions { action, resource })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::users::{CurrentUser, Role, StandType},
        db::store::InMemoryStore,
        test_utils::{create_test_config, create_test_state, create_test_user},
    };
    use axum::{extract::FromRequestParts as _, http::StatusCode};
    use uuid::Uuid;

    fn parts_with_header(name: &str, value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(name, value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    fn proxy_state(store: InMemoryStore, auto_create: bool) -> AppState {
        let mut config = create_test_config();
        config.auth.proxy_header.enabled = true;
        config.auth.proxy_header.auto_create_users = auto_create;
        create_test_state(store, config)
    }

    #[tokio::test]
    async fn test_session_cookie_reads_fresh_user() {
        let store = InMemoryStore::new();
        let state = create_test_state(store.clone(), create_test_config());
        let user = create_test_user(&store, "ward@example.com", Role::Resident).await;

        // Token minted while the user was a resident
        let token = session::create_session_token(&CurrentUser::from(user.clone()), &state.config).unwrap();

        let mut promoted = user.clone();
        promoted.role = Role::MunicipalStaff;
        store
            .update_user(
                user.id,
                &crate::db::models::users::UserUpdateDBRequest {
                    name: promoted.name,
                    email: promoted.email,
                    role: promoted.role,
                    phone: promoted.phone,
                    address: promoted.address,
                    stand_type: promoted.stand_type,
                    password_hash: None,
                },
            )
            .await
            .unwrap();

        let cookie = format!("{}={}", state.config.auth.native.session.cookie_name, token);
        let mut parts = parts_with_header("cookie", &cookie);
        let current = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.role, Role::MunicipalStaff);

        // Deleted accounts lose access
        store.delete_user(user.id).await.unwrap();
        let mut parts = parts_with_header("cookie", &cookie);
        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_existing_proxy_user_extraction() {
        let store = InMemoryStore::new();
        let user = create_test_user(&store, "clerk@example.com", Role::MunicipalStaff).await;
        let state = proxy_state(store, false);

        let mut parts = parts_with_header(&state.config.auth.proxy_header.header_name.clone(), "Clerk@Example.com");
        let current = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current.id, user.id);
        assert!(current.is_staff());
    }

    #[tokio::test]
    async fn test_auto_create_proxy_user() {
        let store = InMemoryStore::new();
        let state = proxy_state(store.clone(), true);

        let mut parts = parts_with_header(&state.config.auth.proxy_header.header_name.clone(), "newcomer@example.com");
        let current = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current.email, "newcomer@example.com");
        assert_eq!(current.username, "newcomer");
        assert_eq!(current.role, Role::Resident);

        let stored = store.get_user_by_email("newcomer@example.com").await.unwrap().unwrap();
        assert_eq!(stored.auth_source, "proxy-header");
        assert_eq!(stored.stand_type, StandType::Residential);
    }

    #[tokio::test]
    async fn test_unknown_proxy_user_without_auto_create() {
        let state = proxy_state(InMemoryStore::new(), false);

        let mut parts = parts_with_header(&state.config.auth.proxy_header.header_name.clone(), "stranger@example.com");
        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_credentials_returns_unauthorized() {
        let state = create_test_state(InMemoryStore::new(), create_test_config());
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_require_staff() {
        let mut user = CurrentUser {
            id: Uuid::new_v4(),
            username: "resident".to_string(),
            email: "resident@example.com".to_string(),
            role: Role::Resident,
            address: None,
        };
        let err = require_staff(&user, Operation::Create, Resource::Bills).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), "Insufficient permissions to create bills");

        user.role = Role::Admin;
        assert!(require_staff(&user, Operation::Delete, Resource::Users).is_ok());
    }

    #[test]
    fn test_require_owner_or_staff() {
        let mut user = CurrentUser {
            id: Uuid::new_v4(),
            username: "resident".to_string(),
            email: "resident@example.com".to_string(),
            role: Role::Resident,
            address: None,
        };
        assert!(require_owner_or_staff(&user, user.id, Operation::Update, Resource::Permits).is_ok());
        let err = require_owner_or_staff(&user, Uuid::new_v4(), Operation::Update, Resource::Permits).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        user.role = Role::MunicipalStaff;
        assert!(require_owner_or_staff(&user, Uuid::new_v4(), Operation::Read, Resource::Ledger).is_ok());
    }
}
