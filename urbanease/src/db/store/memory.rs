//! In-memory implementation of [`Store`].
//!
//! All tables live behind a single `RwLock`, so every operation, including a multi-leg ledger
//! posting, is one critical section. Rows are kept in insertion order, which is also creation
//! order. Data is lost on restart.

use super::Store;
use crate::api::models::{bills::BillStatus, payments::PaymentStatus};
use crate::db::{
    errors::{DbError, Result},
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
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<UserDBResponse>,
    bills: Vec<BillDBResponse>,
    payments: Vec<PaymentDBResponse>,
    permits: Vec<PermitDBResponse>,
    tickets: Vec<TicketDBResponse>,
    schedules: Vec<ScheduleDBResponse>,
    notifications: Vec<NotificationDBResponse>,
    admin_logs: Vec<AdminLogDBResponse>,
    sequences: HashMap<SequenceKind, i64>,
}

impl Tables {
    fn user_exists(&self, id: UserId) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn bill_exists(&self, id: BillId) -> bool {
        self.bills.iter().any(|b| b.id == id)
    }

    fn require_user(&self, id: UserId, table: &str, constraint: &str) -> Result<()> {
        if self.user_exists(id) {
            Ok(())
        } else {
            Err(DbError::missing_reference(table, constraint))
        }
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email.trim()))
    }

    fn next_sequence(&mut self, kind: SequenceKind) -> String {
        let counter = self.sequences.entry(kind).or_insert(0);
        *counter += 1;
        kind.format(*counter)
    }

    /// Mirrors the foreign keys of the Postgres schema, none of which cascade from users.
    fn user_references(&self, id: UserId) -> Option<(&'static str, &'static str)> {
        if self.bills.iter().any(|b| b.user_id == id) {
            return Some(("bills", "bills_user_id_fkey"));
        }
        if self.payments.iter().any(|p| p.account == id) {
            return Some(("payments", "payments_account_fkey"));
        }
        if self.permits.iter().any(|p| p.user_id == id) {
            return Some(("permits", "permits_user_id_fkey"));
        }
        if self.tickets.iter().any(|t| t.user_id == id) {
            return Some(("tickets", "tickets_user_id_fkey"));
        }
        if self.notifications.iter().any(|n| n.user_id == id) {
            return Some(("notifications", "notifications_user_id_fkey"));
        }
        if self.admin_logs.iter().any(|l| l.admin_id == id) {
            return Some(("admin_logs", "admin_logs_admin_id_fkey"));
        }
        None
    }

    fn check_payment(&self, request: &PaymentCreateDBRequest) -> Result<()> {
        self.require_user(request.account, "payments", "payments_account_fkey")?;
        if let Some(bill_id) = request.bill_id
            && !self.bill_exists(bill_id)
        {
            return Err(DbError::missing_reference("payments", "payments_bill_id_fkey"));
        }
        check_positive(request.amount_paid, "payments", "payments_amount_positive")
    }

    fn insert_payment(&mut self, request: PaymentCreateDBRequest) -> PaymentDBResponse {
        let payment = PaymentDBResponse {
            id: Uuid::new_v4(),
            account: request.account,
            bill_id: request.bill_id,
            amount_paid: request.amount_paid,
            payment_method: request.payment_method,
            transaction_code: request.transaction_code,
            status: request.status,
            payment_for: request.payment_for,
            reference: request.reference,
            transaction_id: request.transaction_id,
            description: request.description,
            created_at: Utc::now(),
        };
        self.payments.push(payment.clone());
        payment
    }

    fn settle_if_covered(&mut self, bill_id: BillId) {
        let paid: Decimal = self
            .payments
            .iter()
            .filter(|p| p.bill_id == Some(bill_id) && p.status == PaymentStatus::Paid)
            .map(|p| p.amount_paid)
            .sum();
        if let Some(bill) = self.bills.iter_mut().find(|b| b.id == bill_id)
            && bill.status != BillStatus::Paid
            && bill.amount <= paid
        {
            bill.status = BillStatus::Paid;
            bill.updated_at = Utc::now();
        }
    }
}

fn check_positive(amount: Decimal, table: &str, constraint: &str) -> Result<()> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(DbError::CheckViolation {
            constraint: Some(constraint.to_string()),
            table: Some(table.to_string()),
            message: format!("new row for relation \"{table}\" violates check constraint \"{constraint}\""),
        })
    }
}

fn email_conflict() -> DbError {
    DbError::UniqueViolation {
        constraint: Some("users_email_unique".to_string()),
        table: Some("users".to_string()),
        message: "duplicate key value violates unique constraint \"users_email_unique\"".to_string(),
    }
}

/// Store that keeps everything in process memory.
///
/// # Example
/// ```ignore
/// let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
/// let user = store.create_user(&request).await?;
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_user(tables: &mut Tables, request: &UserCreateDBRequest) -> UserDBResponse {
        let now = Utc::now();
        let user = UserDBResponse {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            email: request.email.trim().to_string(),
            password_hash: request.password_hash.clone(),
            role: request.role,
            phone: request.phone.clone(),
            address: request.address.clone(),
            stand_type: request.stand_type,
            auth_source: request.auth_source.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        user
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write();
        if tables.email_taken(&request.email, None) {
            return Err(email_conflict());
        }
        Ok(Self::insert_user(&mut tables, request))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let email = email.trim();
        Ok(self
            .tables
            .read()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_users_bulk(&self, ids: Vec<UserId>) -> Result<HashMap<UserId, UserDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| (u.id, u.clone()))
            .collect())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .iter()
            .filter(|u| filter.residents.is_none_or(|r| r.matches(u.stand_type)))
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write();
        if !tables.user_exists(id) {
            return Err(DbError::NotFound);
        }
        if tables.email_taken(&request.email, Some(id)) {
            return Err(email_conflict());
        }
        let user = tables.users.iter_mut().find(|u| u.id == id).ok_or(DbError::NotFound)?;
        user.name = request.name.clone();
        user.email = request.email.trim().to_string();
        user.role = request.role;
        user.phone = request.phone.clone();
        user.address = request.address.clone();
        user.stand_type = request.stand_type;
        if let Some(hash) = &request.password_hash {
            user.password_hash = Some(hash.clone());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tables = self.tables.write();
        if !tables.user_exists(id) {
            return Ok(false);
        }
        if let Some((table, constraint)) = tables.user_references(id) {
            return Err(DbError::still_referenced(table, constraint));
        }
        tables.users.retain(|u| u.id != id);
        Ok(true)
    }

    async fn ensure_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write();
        let email = request.email.trim();
        if let Some(user) = tables.users.iter_mut().find(|u| u.email.eq_ignore_ascii_case(email)) {
            if let Some(hash) = &request.password_hash {
                user.password_hash = Some(hash.clone());
            }
            user.updated_at = Utc::now();
            return Ok(user.clone());
        }
        Ok(Self::insert_user(&mut tables, request))
    }

    async fn create_bill(&self, request: &BillCreateDBRequest) -> Result<BillDBResponse> {
        let mut tables = self.tables.write();
        tables.require_user(request.user_id, "bills", "bills_user_id_fkey")?;
        check_positive(request.amount, "bills", "bills_amount_positive")?;
        let now = Utc::now();
        let bill = BillDBResponse {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            bill_type: request.bill_type.clone(),
            amount: request.amount,
            due_date: request.due_date,
            status: request.status,
            created_at: now,
            updated_at: now,
        };
        tables.bills.push(bill.clone());
        Ok(bill)
    }

    async fn get_bill(&self, id: BillId) -> Result<Option<BillDBResponse>> {
        Ok(self.tables.read().bills.iter().find(|b| b.id == id).cloned())
    }

    async fn get_bills_bulk(&self, ids: Vec<BillId>) -> Result<HashMap<BillId, BillDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .bills
            .iter()
            .filter(|b| ids.contains(&b.id))
            .map(|b| (b.id, b.clone()))
            .collect())
    }

    async fn list_bills(&self, filter: &BillFilter) -> Result<Vec<BillDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .bills
            .iter()
            .filter(|b| filter.user_id.is_none_or(|id| b.user_id == id))
            .cloned()
            .collect())
    }

    async fn update_bill(&self, id: BillId, request: &BillUpdateDBRequest) -> Result<BillDBResponse> {
        check_positive(request.amount, "bills", "bills_amount_positive")?;
        let mut tables = self.tables.write();
        let bill = tables.bills.iter_mut().find(|b| b.id == id).ok_or(DbError::NotFound)?;
        bill.bill_type = request.bill_type.clone();
        bill.amount = request.amount;
        bill.due_date = request.due_date;
        bill.status = request.status;
        bill.updated_at = Utc::now();
        Ok(bill.clone())
    }

    async fn delete_bill(&self, id: BillId) -> Result<bool> {
        let mut tables = self.tables.write();
        if !tables.bill_exists(id) {
            return Ok(false);
        }
        tables.bills.retain(|b| b.id != id);
        for payment in tables.payments.iter_mut().filter(|p| p.bill_id == Some(id)) {
            payment.bill_id = None;
        }
        Ok(true)
    }

    async fn create_payment(&self, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse> {
        let mut tables = self.tables.write();
        tables.check_payment(request)?;
        Ok(tables.insert_payment(request.clone()))
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentDBResponse>> {
        Ok(self.tables.read().payments.iter().find(|p| p.id == id).cloned())
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<PaymentDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .payments
            .iter()
            .filter(|p| filter.account.is_none_or(|account| p.account == account))
            .filter(|p| {
                filter
                    .bill_ids
                    .as_ref()
                    .is_none_or(|ids| p.bill_id.is_some_and(|bill_id| ids.contains(&bill_id)))
            })
            .filter(|p| filter.transaction_id.as_ref().is_none_or(|tx| &p.transaction_id == tx))
            .cloned()
            .collect())
    }

    async fn update_payment(&self, id: PaymentId, request: &PaymentUpdateDBRequest) -> Result<PaymentDBResponse> {
        check_positive(request.amount_paid, "payments", "payments_amount_positive")?;
        let mut tables = self.tables.write();
        let payment = tables.payments.iter_mut().find(|p| p.id == id).ok_or(DbError::NotFound)?;
        payment.amount_paid = request.amount_paid;
        payment.payment_method = request.payment_method.clone();
        payment.status = request.status;
        payment.payment_for = request.payment_for.clone();
        payment.description = request.description.clone();
        Ok(payment.clone())
    }

    async fn delete_payment(&self, id: PaymentId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.payments.len();
        tables.payments.retain(|p| p.id != id);
        Ok(tables.payments.len() < before)
    }

    async fn post_transaction(&self, posting: &LedgerPosting) -> Result<PostedTransaction> {
        let mut tables = self.tables.write();

        // Validate every leg before touching any table, so a failure leaves nothing behind.
        for leg in &posting.legs {
            tables.check_payment(leg)?;
        }
        if let Some(bill_id) = posting.settle_bill
            && !tables.bill_exists(bill_id)
        {
            return Err(DbError::missing_reference("payments", "payments_bill_id_fkey"));
        }

        let legs = posting.legs.iter().map(|leg| tables.insert_payment(leg.clone())).collect();

        if let Some(bill_id) = posting.settle_bill {
            tables.settle_if_covered(bill_id);
        }

        Ok(PostedTransaction {
            transaction_id: posting.transaction_id.clone(),
            legs,
        })
    }

    async fn next_sequence_id(&self, kind: SequenceKind) -> Result<String> {
        Ok(self.tables.write().next_sequence(kind))
    }

    async fn create_permit(&self, request: &PermitCreateDBRequest) -> Result<PermitDBResponse> {
        let mut tables = self.tables.write();
        tables.require_user(request.user_id, "permits", "permits_user_id_fkey")?;
        let now = Utc::now();
        let permit = PermitDBResponse {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            permit_type: request.permit_type.clone(),
            description: request.description.clone(),
            location: request.location.clone(),
            submission_date: request.submission_date,
            status: request.status,
            created_at: now,
            updated_at: now,
        };
        tables.permits.push(permit.clone());
        Ok(permit)
    }

    async fn get_permit(&self, id: PermitId) -> Result<Option<PermitDBResponse>> {
        Ok(self.tables.read().permits.iter().find(|p| p.id == id).cloned())
    }

    async fn list_permits(&self, filter: &PermitFilter) -> Result<Vec<PermitDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .permits
            .iter()
            .filter(|p| filter.user_id.is_none_or(|id| p.user_id == id))
            .cloned()
            .collect())
    }

    async fn update_permit(&self, id: PermitId, request: &PermitUpdateDBRequest) -> Result<PermitDBResponse> {
        let mut tables = self.tables.write();
        let permit = tables.permits.iter_mut().find(|p| p.id == id).ok_or(DbError::NotFound)?;
        permit.permit_type = request.permit_type.clone();
        permit.description = request.description.clone();
        permit.location = request.location.clone();
        permit.submission_date = request.submission_date;
        permit.status = request.status;
        permit.updated_at = Utc::now();
        Ok(permit.clone())
    }

    async fn delete_permit(&self, id: PermitId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.permits.len();
        tables.permits.retain(|p| p.id != id);
        Ok(tables.permits.len() < before)
    }

    async fn create_ticket(&self, request: &TicketCreateDBRequest) -> Result<TicketDBResponse> {
        let mut tables = self.tables.write();
        tables.require_user(request.user_id, "tickets", "tickets_user_id_fkey")?;
        let now = Utc::now();
        let ticket = TicketDBResponse {
            id: Uuid::new_v4(),
            ticket_id: tables.next_sequence(SequenceKind::Ticket),
            user_id: request.user_id,
            ticket_type: request.ticket_type.clone(),
            location: request.location.clone(),
            description: request.description.clone(),
            priority: request.priority,
            assigned_to: request.assigned_to.clone(),
            status: request.status,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketDBResponse>> {
        Ok(self.tables.read().tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tickets(&self) -> Result<Vec<TicketDBResponse>> {
        Ok(self.tables.read().tickets.clone())
    }

    async fn update_ticket(&self, id: TicketId, request: &TicketUpdateDBRequest) -> Result<TicketDBResponse> {
        let mut tables = self.tables.write();
        let ticket = tables.tickets.iter_mut().find(|t| t.id == id).ok_or(DbError::NotFound)?;
        ticket.ticket_type = request.ticket_type.clone();
        ticket.location = request.location.clone();
        ticket.description = request.description.clone();
        ticket.priority = request.priority;
        ticket.assigned_to = request.assigned_to.clone();
        ticket.status = request.status;
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn delete_ticket(&self, id: TicketId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.tickets.len();
        tables.tickets.retain(|t| t.id != id);
        Ok(tables.tickets.len() < before)
    }

    async fn create_schedule(&self, request: &ScheduleDBRequest) -> Result<ScheduleDBResponse> {
        let schedule = ScheduleDBResponse {
            id: Uuid::new_v4(),
            service: request.service.clone(),
            date_time: request.date_time,
            location: request.location.clone(),
            frequency: request.frequency.clone(),
            status: request.status,
            description: request.description.clone(),
            created_at: Utc::now(),
        };
        self.tables.write().schedules.push(schedule.clone());
        Ok(schedule)
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<ScheduleDBResponse>> {
        Ok(self.tables.read().schedules.iter().find(|s| s.id == id).cloned())
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduleDBResponse>> {
        let mut schedules = self.tables.read().schedules.clone();
        schedules.sort_by_key(|s| (s.date_time, s.id));
        Ok(schedules)
    }

    async fn update_schedule(&self, id: ScheduleId, request: &ScheduleDBRequest) -> Result<ScheduleDBResponse> {
        let mut tables = self.tables.write();
        let schedule = tables.schedules.iter_mut().find(|s| s.id == id).ok_or(DbError::NotFound)?;
        schedule.service = request.service.clone();
        schedule.date_time = request.date_time;
        schedule.location = request.location.clone();
        schedule.frequency = request.frequency.clone();
        schedule.status = request.status;
        schedule.description = request.description.clone();
        Ok(schedule.clone())
    }

    async fn delete_schedule(&self, id: ScheduleId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.schedules.len();
        tables.schedules.retain(|s| s.id != id);
        Ok(tables.schedules.len() < before)
    }

    async fn create_notification(&self, request: &NotificationCreateDBRequest) -> Result<NotificationDBResponse> {
        let mut tables = self.tables.write();
        tables.require_user(request.user_id, "notifications", "notifications_user_id_fkey")?;
        let notification = NotificationDBResponse {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            message: request.message.clone(),
            status: request.status,
            created_at: Utc::now(),
        };
        tables.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Option<NotificationDBResponse>> {
        Ok(self.tables.read().notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn list_notifications(&self, filter: &NotificationFilter) -> Result<Vec<NotificationDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .notifications
            .iter()
            .filter(|n| filter.user_id.is_none_or(|id| n.user_id == id))
            .cloned()
            .collect())
    }

    async fn update_notification(&self, id: NotificationId, request: &NotificationUpdateDBRequest) -> Result<NotificationDBResponse> {
        let mut tables = self.tables.write();
        let notification = tables.notifications.iter_mut().find(|n| n.id == id).ok_or(DbError::NotFound)?;
        notification.message = request.message.clone();
        notification.status = request.status;
        Ok(notification.clone())
    }

    async fn delete_notification(&self, id: NotificationId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.notifications.len();
        tables.notifications.retain(|n| n.id != id);
        Ok(tables.notifications.len() < before)
    }

    async fn create_admin_log(&self, request: &AdminLogCreateDBRequest) -> Result<AdminLogDBResponse> {
        let mut tables = self.tables.write();
        tables.require_user(request.admin_id, "admin_logs", "admin_logs_admin_id_fkey")?;
        let log = AdminLogDBResponse {
            id: Uuid::new_v4(),
            admin_id: request.admin_id,
            action: request.action.clone(),
            created_at: Utc::now(),
        };
        tables.admin_logs.push(log.clone());
        Ok(log)
    }

    async fn get_admin_log(&self, id: AdminLogId) -> Result<Option<AdminLogDBResponse>> {
        Ok(self.tables.read().admin_logs.iter().find(|l| l.id == id).cloned())
    }

    async fn list_admin_logs(&self) -> Result<Vec<AdminLogDBResponse>> {
        Ok(self.tables.read().admin_logs.clone())
    }

    async fn update_admin_log(&self, id: AdminLogId, request: &AdminLogUpdateDBRequest) -> Result<AdminLogDBResponse> {
        let mut tables = self.tables.write();
        let log = tables.admin_logs.iter_mut().find(|l| l.id == id).ok_or(DbError::NotFound)?;
        log.action = request.action.clone();
        Ok(log.clone())
    }

    async fn delete_admin_log(&self, id: AdminLogId) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.admin_logs.len();
        tables.admin_logs.retain(|l| l.id != id);
        Ok(tables.admin_logs.len() < before)
    }
}
