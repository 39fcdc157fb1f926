//! Database repository for payment legs, including atomic ledger postings.

use crate::types::{PaymentId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::{bills::Bills, repository::Repository},
    models::payments::{
        LedgerPosting, PaymentCreateDBRequest, PaymentDBResponse, PaymentFilter, PaymentUpdateDBRequest, PostedTransaction,
    },
};
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

async fn insert_leg(db: &mut PgConnection, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse> {
    let payment = sqlx::query_as::<_, PaymentDBResponse>(
        r#"
        INSERT INTO payments (
            id, account, bill_id, amount_paid, payment_method, transaction_code,
            status, payment_for, reference, transaction_id, description
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.account)
    .bind(request.bill_id)
    .bind(request.amount_paid)
    .bind(&request.payment_method)
    .bind(request.transaction_code)
    .bind(request.status)
    .bind(&request.payment_for)
    .bind(&request.reference)
    .bind(&request.transaction_id)
    .bind(&request.description)
    .fetch_one(db)
    .await?;

    Ok(payment)
}

#[async_trait::async_trait]
impl<'c> Repository for Payments<'c> {
    type CreateRequest = PaymentCreateDBRequest;
    type UpdateRequest = PaymentUpdateDBRequest;
    type Response = PaymentDBResponse;
    type Id = PaymentId;
    type Filter = PaymentFilter;

    #[instrument(skip(self, request), fields(account = %abbrev_uuid(&request.account), transaction_id = %request.transaction_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        insert_leg(&mut *self.db, request).await
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payment)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<PaymentId>) -> Result<HashMap<Self::Id, PaymentDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let payments = sqlx::query_as::<_, PaymentDBResponse>("SELECT * FROM payments WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(payments.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let payments = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            SELECT * FROM payments
            WHERE ($1::uuid IS NULL OR account = $1)
              AND ($2::uuid[] IS NULL OR bill_id = ANY($2))
              AND ($3::varchar IS NULL OR transaction_id = $3)
            ORDER BY created_at, id
            "#,
        )
        .bind(filter.account)
        .bind(filter.bill_ids.as_deref())
        .bind(filter.transaction_id.as_deref())
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payments)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            UPDATE payments SET
                amount_paid = $2,
                payment_method = $3,
                status = $4,
                payment_for = $5,
                description = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.amount_paid)
        .bind(&request.payment_method)
        .bind(request.status)
        .bind(&request.payment_for)
        .bind(&request.description)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(payment)
    }
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Write every leg of a planned transaction, and settle the linked bill if requested,
    /// inside one database transaction. Any failure rolls back every leg.
    #[instrument(skip(self, posting), fields(transaction_id = %posting.transaction_id, legs = posting.legs.len()), err)]
    pub async fn post(&mut self, posting: &LedgerPosting) -> Result<PostedTransaction> {
        let mut tx = self.db.begin().await?;

        let mut legs = Vec::with_capacity(posting.legs.len());
        for leg in &posting.legs {
            legs.push(insert_leg(&mut tx, leg).await?);
        }

        if let Some(bill_id) = posting.settle_bill {
            Bills::new(&mut tx).settle_if_covered(bill_id).await?;
        }

        tx.commit().await?;

        Ok(PostedTransaction {
            transaction_id: posting.transaction_id.clone(),
            legs,
        })
    }
}
