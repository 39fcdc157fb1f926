//! The storage seam between handlers and persistence.
//!
//! [`Store`] is object safe and held as `Arc<dyn Store>` in the application state. Two
//! implementations exist:
//!
//! - [`postgres::PgStore`] delegates to the repositories in [`crate::db::handlers`]
//! - [`memory::InMemoryStore`] keeps every table behind one `parking_lot::RwLock`; it is
//!   used for local development (`database.type: memory`) and by the HTTP tests
//!
//! Both report failures as [`DbError`](crate::db::errors::DbError) with the same variants for
//! the same conditions, so a duplicate email is a `UniqueViolation` and a dangling reference a
//! `ForeignKeyViolation` regardless of the backend.
//!
//! # Atomicity
//!
//! [`Store::post_transaction`] writes all legs of one ledger transaction and the optional bill
//! settlement as one unit. Either everything is visible afterwards or nothing is. Sequence
//! allocation through [`Store::next_sequence_id`] is atomic with respect to concurrent callers;
//! an identifier taken for a posting that later fails is not reused.

pub mod memory;
pub mod postgres;

use crate::db::{
    errors::Result,
    models::{
        admin_logs::{AdminLogCreateDBRequest, AdminLogDBResponse, AdminLogUpdateDBRequest},
        bills::{BillCreateDBRequest, BillDBResponse, BillFilter, BillUpdateDBRequest},
        notifications::{NotificationCreateDBRequest, NotificationDBResponse, NotificationFilter, NotificationUpdateDBRequest},
        payments::{
            LedgerPosting, PaymentCreateDBRequest, PaymentDBResponse, PaymentFilter, PaymentUpdateDBRequest, PostedTransaction,
        },
        permits::{PermitCreateDBRequest, PermitDBResponse, PermitFilter, PermitUpdateDBRequest},
        schedules::{ScheduleDBRequest, ScheduleDBResponse},
        sequences::SequenceKind,
        tickets::{TicketCreateDBRequest, TicketDBResponse, TicketUpdateDBRequest},
        users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
    },
};
use crate::types::{AdminLogId, BillId, NotificationId, PaymentId, PermitId, ScheduleId, TicketId, UserId};
use std::collections::HashMap;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;
    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>>;
    /// Case-insensitive lookup
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;
    async fn get_users_bulk(&self, ids: Vec<UserId>) -> Result<HashMap<UserId, UserDBResponse>>;
    /// Ordered by creation time, then id
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserDBResponse>>;
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse>;
    async fn delete_user(&self, id: UserId) -> Result<bool>;
    /// Create the account unless one with the same email exists; a supplied password hash
    /// replaces the existing one.
    async fn ensure_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    // Bills
    async fn create_bill(&self, request: &BillCreateDBRequest) -> Result<BillDBResponse>;
    async fn get_bill(&self, id: BillId) -> Result<Option<BillDBResponse>>;
    async fn get_bills_bulk(&self, ids: Vec<BillId>) -> Result<HashMap<BillId, BillDBResponse>>;
    async fn list_bills(&self, filter: &BillFilter) -> Result<Vec<BillDBResponse>>;
    async fn update_bill(&self, id: BillId, request: &BillUpdateDBRequest) -> Result<BillDBResponse>;
    /// Linked payment legs are kept with their bill reference cleared
    async fn delete_bill(&self, id: BillId) -> Result<bool>;

    // Payments and the ledger
    async fn create_payment(&self, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse>;
    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentDBResponse>>;
    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<PaymentDBResponse>>;
    async fn update_payment(&self, id: PaymentId, request: &PaymentUpdateDBRequest) -> Result<PaymentDBResponse>;
    async fn delete_payment(&self, id: PaymentId) -> Result<bool>;
    /// Write every leg of one ledger transaction atomically
    async fn post_transaction(&self, posting: &LedgerPosting) -> Result<PostedTransaction>;
    async fn next_sequence_id(&self, kind: SequenceKind) -> Result<String>;

    // Permits
    async fn create_permit(&self, request: &PermitCreateDBRequest) -> Result<PermitDBResponse>;
    async fn get_permit(&self, id: PermitId) -> Result<Option<PermitDBResponse>>;
    async fn list_permits(&self, filter: &PermitFilter) -> Result<Vec<PermitDBResponse>>;
    async fn update_permit(&self, id: PermitId, request: &PermitUpdateDBRequest) -> Result<PermitDBResponse>;
    async fn delete_permit(&self, id: PermitId) -> Result<bool>;

    // Tickets
    /// Allocates the ticket's `TKT-` id in the same unit of work as the insert
    async fn create_ticket(&self, request: &TicketCreateDBRequest) -> Result<TicketDBResponse>;
    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketDBResponse>>;
    async fn list_tickets(&self) -> Result<Vec<TicketDBResponse>>;
    async fn update_ticket(&self, id: TicketId, request: &TicketUpdateDBRequest) -> Result<TicketDBResponse>;
    async fn delete_ticket(&self, id: TicketId) -> Result<bool>;

    // Service schedules
    async fn create_schedule(&self, request: &ScheduleDBRequest) -> Result<ScheduleDBResponse>;
    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<ScheduleDBResponse>>;
    async fn list_schedules(&self) -> Result<Vec<ScheduleDBResponse>>;
    async fn update_schedule(&self, id: ScheduleId, request: &ScheduleDBRequest) -> Result<ScheduleDBResponse>;
    async fn delete_schedule(&self, id: ScheduleId) -> Result<bool>;

    // Notifications
    async fn create_notification(&self, request: &NotificationCreateDBRequest) -> Result<NotificationDBResponse>;
    async fn get_notification(&self, id: NotificationId) -> Result<Option<NotificationDBResponse>>;
    async fn list_notifications(&self, filter: &NotificationFilter) -> Result<Vec<NotificationDBResponse>>;
    async fn update_notification(&self, id: NotificationId, request: &NotificationUpdateDBRequest) -> Result<NotificationDBResponse>;
    async fn delete_notification(&self, id: NotificationId) -> Result<bool>;

    // Admin log
    async fn create_admin_log(&self, request: &AdminLogCreateDBRequest) -> Result<AdminLogDBResponse>;
    async fn get_admin_log(&self, id: AdminLogId) -> Result<Option<AdminLogDBResponse>>;
    async fn list_admin_logs(&self) -> Result<Vec<AdminLogDBResponse>>;
    async fn update_admin_log(&self, id: AdminLogId, request: &AdminLogUpdateDBRequest) -> Result<AdminLogDBResponse>;
    async fn delete_admin_log(&self, id: AdminLogId) -> Result<bool>;

    /// Release backend resources at shutdown
    async fn close(&self) {}
}
