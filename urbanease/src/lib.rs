//! # urbanease: Municipal Services API
//!
//! `urbanease` is the backend for a municipal services portal. Residents use it to raise service
//! requests, apply for permits and pay their bills; municipal staff use it to manage accounts,
//! raise bills, schedule services and keep an audit log of administrative actions.
//!
//! ## Overview
//!
//! Most of the API is plain create/read/update/delete over a handful of tables. The exception is
//! the [`ledger`]: every payment is written as a set of legs that share one transaction id and
//! cancel each other out. A single payment produces a payer leg and an opposite leg on the
//! treasury account; bulk billing charges every matching resident and credits the account that
//! raised the charge with the total.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer.
//! Persistence sits behind the [`db::Store`] trait, with a PostgreSQL implementation for
//! production and an in-memory one for local development and tests.
//!
//! ### Request Flow
//!
//! Every request under `/api` (except sign-up and login) is authenticated by the
//! [`CurrentUser`](api::models::users::CurrentUser) extractor, which accepts a session cookie
//! issued by `/api/auth/login` or an email header set by a trusted identity-aware proxy. The
//! account is re-read on every request, so role changes and deletions apply immediately.
//! Handlers then check the caller's role, validate the body, and call the store or the ledger.
//!
//! ### Core Components
//!
//! - [`api`]: route handlers and the JSON request/response models
//! - [`auth`]: password hashing, session tokens and the identity extractor
//! - [`db`]: the storage trait, repositories and record models
//! - [`ledger`]: double-entry payment planning and posting
//! - [`config`]: YAML and environment configuration
//! - [`telemetry`] and [`metrics`]: tracing, OTLP export and Prometheus counters
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use urbanease::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = urbanease::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     urbanease::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! With `database.type: postgres` the embedded migrations run on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! urbanease::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod ledger;
pub mod metrics;
mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

use crate::{
    api::models::users::{Role, StandType},
    auth::password,
    config::CorsOrigin,
    db::{
        InMemoryStore, PgStore, Store,
        models::users::UserCreateDBRequest,
    },
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::{delete, get, post, put},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use types::UserId;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `store`: Storage backend, Postgres or in-memory
/// - `config`: Application configuration
/// - `treasury_account`: Account on the other side of every single payment, resolved once at
///   startup from `ledger.treasury_account_email`
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub treasury_account: UserId,
}

/// Get the urbanease database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Open the configured storage backend, running migrations for Postgres.
#[instrument(skip_all)]
pub async fn setup_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.database.url() {
        Some(url) => {
            let settings = config.database.pool_settings();
            let mut options = PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .min_connections(settings.min_connections)
                .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
            if settings.idle_timeout_secs > 0 {
                options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
            }
            if settings.max_lifetime_secs > 0 {
                options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
            }

            let pool = options.connect(url).await?;
            migrator().run(&pool).await?;
            info!("Connected to PostgreSQL and applied migrations");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            info!("Using in-memory storage; data will not survive a restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

/// Create or refresh the administrator account from configuration.
///
/// The account is a `SYSTEM` stand so it is never picked up by bulk billing. A configured
/// `admin_password` replaces the stored hash on every start.
#[instrument(skip_all, fields(email = %config.admin_email))]
pub async fn ensure_admin_user(store: &dyn Store, config: &Config) -> anyhow::Result<UserId> {
    let password_hash = match config.admin_password.clone() {
        Some(admin_password) => {
            let params = password::Argon2Params::from(&config.auth.native.password);
            Some(password::hash_password(admin_password, params).await?)
        }
        None => None,
    };

    let admin = store
        .ensure_user(&UserCreateDBRequest {
            name: config.admin_name.clone(),
            email: config.admin_email.clone(),
            password_hash,
            role: Role::Admin,
            phone: config.admin_phone.clone(),
            address: None,
            stand_type: StandType::System,
            auth_source: "system".to_string(),
        })
        .await?;

    debug!("Administrator account ready: {}", admin.id);
    Ok(admin.id)
}

/// Look up the treasury account. It must exist before the server accepts payments.
#[instrument(skip_all)]
pub async fn resolve_treasury_account(store: &dyn Store, config: &Config) -> anyhow::Result<UserId> {
    let email = config.treasury_account_email();
    let account = store
        .get_user_by_email(email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Treasury account '{email}' does not exist; create it or set ledger.treasury_account_email"))?;

    info!("Treasury account resolved to {}", types::abbrev_uuid(&account.id));
    Ok(account.id)
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::ACCEPT])
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Routes under `/api`, all of which share the application state.
fn api_routes() -> Router<AppState> {
    use api::handlers::{admin_logs, auth, bills, notifications, payments, permits, schedules, tickets, users};

    Router::new()
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        // Authentication
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::get_session))
        // Users
        .route("/users/add", post(users::create_user))
        .route("/users/all", get(users::list_users))
        .route("/users/get/{id}", get(users::get_user))
        .route("/users/update/{id}", put(users::update_user))
        .route("/users/delete/{id}", delete(users::delete_user))
        .route("/users/delete", delete(users::delete_user_by_body))
        // Bills and bulk billing
        .route("/bills/add", post(bills::create_bill))
        .route("/bills/all", get(bills::list_bills))
        .route("/bills/get/{id}", get(bills::get_bill))
        .route("/bills/update/{id}", put(bills::update_bill))
        .route("/bills/delete/{id}", delete(bills::delete_bill))
        .route("/bills/residents", post(bills::bill_residents))
        // Payments and the ledger
        .route("/payments/add", post(payments::create_payment))
        .route("/payments/all", get(payments::list_payments))
        .route("/payments/get/{id}", get(payments::get_payment))
        .route("/payments/update/{id}", put(payments::update_payment))
        .route("/payments/delete/{id}", delete(payments::delete_payment))
        .route("/payments/pay", post(payments::pay))
        .route("/payments/statement", get(payments::get_statement))
        // Permits
        .route("/permits/add", post(permits::create_permit))
        .route("/permits/all", get(permits::list_permits))
        .route("/permits/all-by-user-id", get(permits::list_permits_by_user))
        .route("/permits/get/{id}", get(permits::get_permit))
        .route("/permits/update/{id}", put(permits::update_permit))
        .route("/permits/delete/{id}", delete(permits::delete_permit))
        // Service requests
        .route("/service-requests/add", post(tickets::create_ticket))
        .route("/service-requests/all", get(tickets::list_tickets))
        .route("/service-requests/get/{id}", get(tickets::get_ticket))
        .route("/service-requests/update/{id}", put(tickets::update_ticket))
        .route("/service-requests/delete/{id}", delete(tickets::delete_ticket))
        // Service schedules
        .route("/service-schedules/add", post(schedules::create_schedule))
        .route("/service-schedules/all", get(schedules::list_schedules))
        .route("/service-schedules/get/{id}", get(schedules::get_schedule))
        .route("/service-schedules/update/{id}", put(schedules::update_schedule))
        .route("/service-schedules/delete/{id}", delete(schedules::delete_schedule))
        // Notifications
        .route("/notifications/add", post(notifications::create_notification))
        .route("/notifications/all", get(notifications::list_notifications))
        .route("/notifications/get/{id}", get(notifications::get_notification))
        .route("/notifications/update/{id}", put(notifications::update_notification))
        .route("/notifications/delete/{id}", delete(notifications::delete_notification))
        // Admin audit log
        .route("/admin-log/add", post(admin_logs::create_admin_log))
        .route("/admin-log/all", get(admin_logs::list_admin_logs))
        .route("/admin-log/get/{id}", get(admin_logs::get_admin_log))
        .route("/admin-log/update/{id}", put(admin_logs::update_admin_log))
        .route("/admin-log/delete/{id}", delete(admin_logs::delete_admin_log))
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - The resource and authentication routes under `/api`
/// - The OpenAPI document at `/api/openapi.json` and the Scalar UI at `/docs`
/// - A liveness probe at `/healthz`
/// - Optional Prometheus metrics at `/internal/metrics`
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = api_routes().with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

        // HTTP metrics from axum-prometheus followed by the ledger counters
        router = router
            .route(
                "/internal/metrics",
                get(|| async move {
                    let mut output = metric_handle.render();
                    output.push_str(&metrics::render_default_registry());
                    output
                }),
            )
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and the storage backend.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] opens the store, runs migrations, ensures the
///    administrator account and resolves the treasury account
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight requests finish and the
///    store is closed
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting urbanease with configuration: {:#?}", config);
        let store = setup_store(&config).await?;
        Self::with_store(config, store).await
    }

    /// Create an application over an already opened store
    pub async fn with_store(config: Config, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        ensure_admin_user(store.as_ref(), &config).await?;
        let treasury_account = resolve_treasury_account(store.as_ref(), &config).await?;

        let app_state = AppState::builder()
            .store(store)
            .config(config.clone())
            .treasury_account(treasury_account)
            .build();

        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            app_state,
            config,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "urbanease listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing storage...");
        self.app_state.store.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::create_test_config;
    use axum::http::StatusCode;

    #[test_log::test(tokio::test)]
    async fn test_healthz_and_openapi() {
        let store = Arc::new(InMemoryStore::new());
        let server = Application::with_store(create_test_config(), store)
            .await
            .unwrap()
            .into_test_server();

        let health = server.get("/healthz").await;
        health.assert_status_ok();
        health.assert_text("OK");

        let response = server.get("/api/openapi.json").await;
        response.assert_status_ok();
        let document: serde_json::Value = response.json();
        assert!(document["paths"]["/api/bills/residents"].is_object());
        assert!(document["paths"]["/api/payments/pay"].is_object());
    }

    #[test_log::test(tokio::test)]
    async fn test_api_requires_authentication() {
        let store = Arc::new(InMemoryStore::new());
        let server = Application::with_store(create_test_config(), store)
            .await
            .unwrap()
            .into_test_server();

        let response = server.get("/api/bills/all").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert!(body["message"].is_string());
    }

    #[test_log::test(tokio::test)]
    async fn test_admin_account_is_ensured_and_used_as_treasury() {
        let store = InMemoryStore::new();
        let mut config = create_test_config();
        config.admin_password = Some("initial-password".to_string());

        let app = Application::with_store(config.clone(), Arc::new(store.clone())).await.unwrap();
        let admin = store.get_user_by_email(&config.admin_email).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.stand_type, StandType::System);
        assert_eq!(admin.auth_source, "system");
        assert_eq!(app.state().treasury_account, admin.id);
        let first_hash = admin.password_hash.clone().unwrap();

        // A second start keeps the same account and refreshes the password
        config.admin_password = Some("rotated-password".to_string());
        let again = ensure_admin_user(&store, &config).await.unwrap();
        assert_eq!(again, admin.id);
        let refreshed = store.get_user(admin.id).await.unwrap().unwrap();
        assert_ne!(refreshed.password_hash.unwrap(), first_hash);
    }

    #[test_log::test(tokio::test)]
    async fn test_separate_treasury_account_must_exist() {
        let store = InMemoryStore::new();
        let mut config = create_test_config();
        config.ledger.treasury_account_email = Some("treasury@city.example".to_string());

        let result = Application::with_store(config.clone(), Arc::new(store.clone())).await;
        assert!(result.is_err());

        let treasury = crate::test_utils::create_test_user(&store, "treasury@city.example", Role::MunicipalStaff).await;
        let app = Application::with_store(config, Arc::new(store)).await.unwrap();
        assert_eq!(app.state().treasury_account, treasury.id);
    }

    #[test]
    fn test_cors_layer_accepts_configured_origins() {
        let mut config = create_test_config();
        assert!(create_cors_layer(&config).is_ok());

        config.auth.security.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        config.auth.security.cors.allow_credentials = false;
        assert!(create_cors_layer(&config).is_ok());
    }
}
