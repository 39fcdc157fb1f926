//! Database repository for bills.

use crate::types::{BillId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::bills::{BillCreateDBRequest, BillDBResponse, BillFilter, BillUpdateDBRequest},
};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

pub struct Bills<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Bills<'c> {
    type CreateRequest = BillCreateDBRequest;
    type UpdateRequest = BillUpdateDBRequest;
    type Response = BillDBResponse;
    type Id = BillId;
    type Filter = BillFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), amount = %request.amount), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let bill = sqlx::query_as::<_, BillDBResponse>(
            r#"
            INSERT INTO bills (id, user_id, bill_type, amount, due_date, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.bill_type)
        .bind(request.amount)
        .bind(request.due_date)
        .bind(request.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(bill)
    }

    #[instrument(skip(self), fields(bill_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let bill = sqlx::query_as::<_, BillDBResponse>("SELECT * FROM bills WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(bill)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<BillId>) -> Result<HashMap<Self::Id, BillDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let bills = sqlx::query_as::<_, BillDBResponse>("SELECT * FROM bills WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(bills.into_iter().map(|b| (b.id, b)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let bills = sqlx::query_as::<_, BillDBResponse>(
            "SELECT * FROM bills WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at, id",
        )
        .bind(filter.user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(bills)
    }

    #[instrument(skip(self), fields(bill_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bills WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(bill_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let bill = sqlx::query_as::<_, BillDBResponse>(
            r#"
            UPDATE bills SET
                bill_type = $2,
                amount = $3,
                due_date = $4,
                status = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.bill_type)
        .bind(request.amount)
        .bind(request.due_date)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(bill)
    }
}

impl<'c> Bills<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Mark the bill `PAID` once its linked `PAID` legs cover the amount owed.
    /// Returns whether the status changed.
    #[instrument(skip(self), fields(bill_id = %abbrev_uuid(&id)), err)]
    pub async fn settle_if_covered(&mut self, id: BillId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bills SET status = 'PAID', updated_at = NOW()
            WHERE id = $1
              AND status <> 'PAID'
              AND amount <= (
                  SELECT COALESCE(SUM(amount_paid), 0) FROM payments
                  WHERE bill_id = $1 AND status = 'PAID'
              )
            "#,
        )
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
