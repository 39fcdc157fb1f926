//! OpenAPI documentation for the `/api` surface.
//!
//! The document is served as JSON at `/api/openapi.json` and rendered with Scalar at `/docs`.
//! Every handler carries its own `#[utoipa::path]`; this module only collects them and
//! declares the two authentication schemes.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Session cookie and trusted proxy header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "urbanease_session",
                    "Session token set by `POST /api/auth/login`.",
                ))),
            );
            components.security_schemes.insert(
                "ProxyHeader".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-forwarded-email",
                    "Email of a user already authenticated by a trusted reverse proxy. The header name is configurable.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::signup,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::get_session,
        api::handlers::users::create_user,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::users::delete_user_by_body,
        api::handlers::bills::create_bill,
        api::handlers::bills::list_bills,
        api::handlers::bills::get_bill,
        api::handlers::bills::update_bill,
        api::handlers::bills::delete_bill,
        api::handlers::bills::bill_residents,
        api::handlers::payments::create_payment,
        api::handlers::payments::list_payments,
        api::handlers::payments::get_payment,
        api::handlers::payments::update_payment,
        api::handlers::payments::delete_payment,
        api::handlers::payments::pay,
        api::handlers::payments::get_statement,
        api::handlers::permits::create_permit,
        api::handlers::permits::list_permits,
        api::handlers::permits::list_permits_by_user,
        api::handlers::permits::get_permit,
        api::handlers::permits::update_permit,
        api::handlers::permits::delete_permit,
        api::handlers::tickets::create_ticket,
        api::handlers::tickets::list_tickets,
        api::handlers::tickets::get_ticket,
        api::handlers::tickets::update_ticket,
        api::handlers::tickets::delete_ticket,
        api::handlers::schedules::create_schedule,
        api::handlers::schedules::list_schedules,
        api::handlers::schedules::get_schedule,
        api::handlers::schedules::update_schedule,
        api::handlers::schedules::delete_schedule,
        api::handlers::notifications::create_notification,
        api::handlers::notifications::list_notifications,
        api::handlers::notifications::get_notification,
        api::handlers::notifications::update_notification,
        api::handlers::notifications::delete_notification,
        api::handlers::admin_logs::create_admin_log,
        api::handlers::admin_logs::list_admin_logs,
        api::handlers::admin_logs::get_admin_log,
        api::handlers::admin_logs::update_admin_log,
        api::handlers::admin_logs::delete_admin_log,
    ),
    components(
        schemas(
            api::models::MessageResponse,
            api::models::auth::SignupRequest,
            api::models::auth::LoginRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
            api::models::users::Role,
            api::models::users::StandType,
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::UserDeleteRequest,
            api::models::users::UserResponse,
            api::models::users::UserEnvelope,
            api::models::users::UserListEnvelope,
            api::models::users::CurrentUser,
            api::models::bills::BillStatus,
            api::models::bills::BillCreate,
            api::models::bills::BillUpdate,
            api::models::bills::BillResponse,
            api::models::bills::BillEnvelope,
            api::models::bills::BillListEnvelope,
            api::models::bills::BulkBillingRequest,
            api::models::bills::BulkBillingResponse,
            api::models::payments::PaymentStatus,
            api::models::payments::PaymentCreate,
            api::models::payments::PaymentUpdate,
            api::models::payments::PaymentResponse,
            api::models::payments::PaymentEnvelope,
            api::models::payments::PaymentListEnvelope,
            api::models::payments::SinglePaymentRequest,
            api::models::payments::SinglePaymentResponse,
            api::models::payments::StatementResponse,
            api::models::permits::PermitStatus,
            api::models::permits::PermitCreate,
            api::models::permits::PermitUpdate,
            api::models::permits::PermitResponse,
            api::models::permits::PermitEnvelope,
            api::models::permits::PermitListEnvelope,
            api::models::tickets::TicketPriority,
            api::models::tickets::TicketStatus,
            api::models::tickets::TicketCreate,
            api::models::tickets::TicketUpdate,
            api::models::tickets::TicketResponse,
            api::models::tickets::TicketEnvelope,
            api::models::tickets::TicketListEnvelope,
            api::models::schedules::ScheduleStatus,
            api::models::schedules::ScheduleRequest,
            api::models::schedules::ScheduleResponse,
            api::models::schedules::ScheduleEnvelope,
            api::models::schedules::ScheduleListEnvelope,
            api::models::notifications::NotificationStatus,
            api::models::notifications::NotificationCreate,
            api::models::notifications::NotificationUpdate,
            api::models::notifications::NotificationResponse,
            api::models::notifications::NotificationEnvelope,
            api::models::notifications::NotificationListEnvelope,
            api::models::admin_logs::AdminLogCreate,
            api::models::admin_logs::AdminLogUpdate,
            api::models::admin_logs::AdminLogResponse,
            api::models::admin_logs::AdminLogEnvelope,
            api::models::admin_logs::AdminLogListEnvelope,
        )
    ),
    tags(
        (name = "authentication", description = "Sign-up, login and the current session"),
        (name = "users", description = "Resident and staff accounts"),
        (name = "bills", description = "Bills and bulk billing of residents"),
        (name = "payments", description = "Ledger legs, single payments and account statements"),
        (name = "permits", description = "Permit applications"),
        (name = "service-requests", description = "Resident service requests (tickets)"),
        (name = "service-schedules", description = "Published municipal service schedules"),
        (name = "notifications", description = "Messages to residents"),
        (name = "admin-log", description = "Audit trail of administrative actions"),
    ),
    info(
        title = "UrbanEase API",
        version = "1.0.0",
        description = "Municipal services: resident accounts, billing, payments, permits and service requests.

## Authentication

Sign in with `POST /api/auth/login`; the response sets an HTTP-only session cookie. Deployments behind
an authenticating reverse proxy may instead forward the user's email in a trusted header.

## Errors

Every error body is a single message:

```json
{ \"message\": \"All fields are required!\" }
```

## Money

Payments are double-entry: each transaction writes legs with `transactionCode` `1` (credit) or `-1`
(debit) sharing one `transactionId`, and the legs of a transaction always sum to zero.",
    ),
)]
pub struct ApiDoc;
