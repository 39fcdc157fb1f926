//! Test utilities shared by the unit and HTTP tests.

use crate::{
    AppState, Application,
    api::models::users::{Role, StandType},
    config::{Config, PasswordConfig, ProxyHeaderAuthConfig},
    db::{
        InMemoryStore, Store,
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
};
use axum_test::TestServer;
use std::sync::Arc;
use uuid::Uuid;

/// Build a test server over a fresh in-memory store. The store handle is returned so tests can
/// seed rows and inspect what the handlers wrote.
pub async fn create_test_app() -> (TestServer, InMemoryStore) {
    let store = InMemoryStore::new();
    let app = Application::with_store(create_test_config(), Arc::new(store.clone()))
        .await
        .expect("Failed to create application");
    (app.into_test_server(), store)
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key-for-session-tokens".to_string()),
        enable_metrics: false,
        ..Default::default()
    };

    // Cheap hashing keeps the auth tests fast
    config.auth.native.password = PasswordConfig {
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Default::default()
    };
    config.auth.native.session.cookie_secure = false;
    config.auth.proxy_header = ProxyHeaderAuthConfig {
        enabled: true,
        auto_create_users: false,
        ..Default::default()
    };
    config
}

/// Application state for extractor tests. The treasury account is a placeholder; tests that
/// post payments go through [`create_test_app`] instead.
pub fn create_test_state(store: InMemoryStore, config: Config) -> AppState {
    AppState::builder()
        .store(Arc::new(store))
        .config(config)
        .treasury_account(Uuid::nil())
        .build()
}

pub async fn create_test_user(store: &dyn Store, email: &str, role: Role) -> UserDBResponse {
    store
        .create_user(&UserCreateDBRequest {
            name: email.split('@').next().unwrap_or("test").to_string(),
            email: email.to_string(),
            password_hash: None,
            role,
            phone: Some("+263 77 000 0000".to_string()),
            address: Some("1 Test Street".to_string()),
            stand_type: StandType::Residential,
            auth_source: "native".to_string(),
        })
        .await
        .expect("Failed to create test user")
}

pub async fn create_test_resident(store: &dyn Store, stand_type: StandType) -> UserDBResponse {
    let email = format!("resident-{}@example.com", Uuid::new_v4().simple());
    store
        .create_user(&UserCreateDBRequest {
            name: "Test Resident".to_string(),
            email,
            password_hash: None,
            role: Role::Resident,
            phone: None,
            address: Some("Stand 42".to_string()),
            stand_type,
            auth_source: "native".to_string(),
        })
        .await
        .expect("Failed to create test resident")
}

/// A staff account with a unique email
pub async fn create_test_staff(store: &dyn Store) -> UserDBResponse {
    let email = format!("staff-{}@city.example", Uuid::new_v4().simple());
    create_test_user(store, &email, Role::MunicipalStaff).await
}

pub async fn get_admin_user(store: &dyn Store) -> UserDBResponse {
    store
        .get_user_by_email(&create_test_config().admin_email)
        .await
        .expect("Failed to look up admin")
        .expect("Admin account should exist")
}

/// Headers that authenticate `user` through the trusted proxy header.
pub fn add_auth_headers(user: &UserDBResponse) -> Vec<(String, String)> {
    let proxy = ProxyHeaderAuthConfig::default();
    vec![(proxy.header_name, user.email.clone())]
}
