//! Postgres implementation of [`Store`].

use super::Store;
use crate::db::{
    errors::Result,
    handlers::{AdminLogs, Bills, Notifications, Payments, Permits, Repository, Schedules, Sequences, Tickets, Users},
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
use sqlx::PgPool;
use std::collections::HashMap;

/// Store backed by a Postgres connection pool. Every call checks out one connection; calls
/// that write several rows open a transaction on it.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).create(request).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_by_id(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_user_by_email(email).await
    }

    async fn get_users_bulk(&self, ids: Vec<UserId>) -> Result<HashMap<UserId, UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_bulk(ids).await
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).list(filter).await
    }

    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).update(id, request).await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).delete(id).await
    }

    async fn ensure_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut tx = self.pool.begin().await?;
        let user = Users::new(&mut tx).ensure(request).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn create_bill(&self, request: &BillCreateDBRequest) -> Result<BillDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Bills::new(&mut conn).create(request).await
    }

    async fn get_bill(&self, id: BillId) -> Result<Option<BillDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Bills::new(&mut conn).get_by_id(id).await
    }

    async fn get_bills_bulk(&self, ids: Vec<BillId>) -> Result<HashMap<BillId, BillDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Bills::new(&mut conn).get_bulk(ids).await
    }

    async fn list_bills(&self, filter: &BillFilter) -> Result<Vec<BillDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Bills::new(&mut conn).list(filter).await
    }

    async fn update_bill(&self, id: BillId, request: &BillUpdateDBRequest) -> Result<BillDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Bills::new(&mut conn).update(id, request).await
    }

    async fn delete_bill(&self, id: BillId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Bills::new(&mut conn).delete(id).await
    }

    async fn create_payment(&self, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Payments::new(&mut conn).create(request).await
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Payments::new(&mut conn).get_by_id(id).await
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<PaymentDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Payments::new(&mut conn).list(filter).await
    }

    async fn update_payment(&self, id: PaymentId, request: &PaymentUpdateDBRequest) -> Result<PaymentDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Payments::new(&mut conn).update(id, request).await
    }

    async fn delete_payment(&self, id: PaymentId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Payments::new(&mut conn).delete(id).await
    }

    async fn post_transaction(&self, posting: &LedgerPosting) -> Result<PostedTransaction> {
        let mut conn = self.pool.acquire().await?;
        Payments::new(&mut conn).post(posting).await
    }

    async fn next_sequence_id(&self, kind: SequenceKind) -> Result<String> {
        let mut conn = self.pool.acquire().await?;
        Sequences::new(&mut conn).next(kind).await
    }

    async fn create_permit(&self, request: &PermitCreateDBRequest) -> Result<PermitDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Permits::new(&mut conn).create(request).await
    }

    async fn get_permit(&self, id: PermitId) -> Result<Option<PermitDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Permits::new(&mut conn).get_by_id(id).await
    }

    async fn list_permits(&self, filter: &PermitFilter) -> Result<Vec<PermitDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Permits::new(&mut conn).list(filter).await
    }

    async fn update_permit(&self, id: PermitId, request: &PermitUpdateDBRequest) -> Result<PermitDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Permits::new(&mut conn).update(id, request).await
    }

    async fn delete_permit(&self, id: PermitId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Permits::new(&mut conn).delete(id).await
    }

    async fn create_ticket(&self, request: &TicketCreateDBRequest) -> Result<TicketDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Tickets::new(&mut conn).create(request).await
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Tickets::new(&mut conn).get_by_id(id).await
    }

    async fn list_tickets(&self) -> Result<Vec<TicketDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Tickets::new(&mut conn).list(&()).await
    }

    async fn update_ticket(&self, id: TicketId, request: &TicketUpdateDBRequest) -> Result<TicketDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Tickets::new(&mut conn).update(id, request).await
    }

    async fn delete_ticket(&self, id: TicketId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Tickets::new(&mut conn).delete(id).await
    }

    async fn create_schedule(&self, request: &ScheduleDBRequest) -> Result<ScheduleDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Schedules::new(&mut conn).create(request).await
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<ScheduleDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Schedules::new(&mut conn).get_by_id(id).await
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduleDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Schedules::new(&mut conn).list(&()).await
    }

    async fn update_schedule(&self, id: ScheduleId, request: &ScheduleDBRequest) -> Result<ScheduleDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Schedules::new(&mut conn).update(id, request).await
    }

    async fn delete_schedule(&self, id: ScheduleId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Schedules::new(&mut conn).delete(id).await
    }

    async fn create_notification(&self, request: &NotificationCreateDBRequest) -> Result<NotificationDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Notifications::new(&mut conn).create(request).await
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Option<NotificationDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Notifications::new(&mut conn).get_by_id(id).await
    }

    async fn list_notifications(&self, filter: &NotificationFilter) -> Result<Vec<NotificationDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Notifications::new(&mut conn).list(filter).await
    }

    async fn update_notification(&self, id: NotificationId, request: &NotificationUpdateDBRequest) -> Result<NotificationDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Notifications::new(&mut conn).update(id, request).await
    }

    async fn delete_notification(&self, id: NotificationId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Notifications::new(&mut conn).delete(id).await
    }

    async fn create_admin_log(&self, request: &AdminLogCreateDBRequest) -> Result<AdminLogDBResponse> {
        let mut conn = self.pool.acquire().await?;
        AdminLogs::new(&mut conn).create(request).await
    }

    async fn get_admin_log(&self, id: AdminLogId) -> Result<Option<AdminLogDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        AdminLogs::new(&mut conn).get_by_id(id).await
    }

    async fn list_admin_logs(&self) -> Result<Vec<AdminLogDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        AdminLogs::new(&mut conn).list(&()).await
    }

    async fn update_admin_log(&self, id: AdminLogId, request: &AdminLogUpdateDBRequest) -> Result<AdminLogDBResponse> {
        let mut conn = self.pool.acquire().await?;
        AdminLogs::new(&mut conn).update(id, request).await
    }

    async fn delete_admin_log(&self, id: AdminLogId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        AdminLogs::new(&mut conn).delete(id).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
