//! Database repository for permit applications.

use crate::types::{PermitId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::permits::{PermitCreateDBRequest, PermitDBResponse, PermitFilter, PermitUpdateDBRequest},
};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

pub struct Permits<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Permits<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Permits<'c> {
    type CreateRequest = PermitCreateDBRequest;
    type UpdateRequest = PermitUpdateDBRequest;
    type Response = PermitDBResponse;
    type Id = PermitId;
    type Filter = PermitFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let permit = sqlx::query_as::<_, PermitDBResponse>(
            r#"
            INSERT INTO permits (id, user_id, permit_type, description, location, submission_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.permit_type)
        .bind(&request.description)
        .bind(&request.location)
        .bind(request.submission_date)
        .bind(request.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(permit)
    }

    #[instrument(skip(self), fields(permit_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let permit = sqlx::query_as::<_, PermitDBResponse>("SELECT * FROM permits WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(permit)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<PermitId>) -> Result<HashMap<Self::Id, PermitDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let permits = sqlx::query_as::<_, PermitDBResponse>("SELECT * FROM permits WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(permits.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let permits = sqlx::query_as::<_, PermitDBResponse>(
            "SELECT * FROM permits WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at, id",
        )
        .bind(filter.user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(permits)
    }

    #[instrument(skip(self), fields(permit_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM permits WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(permit_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let permit = sqlx::query_as::<_, PermitDBResponse>(
            r#"
            UPDATE permits SET
                permit_type = $2,
                description = $3,
                location = $4,
                submission_date = $5,
                status = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.permit_type)
        .bind(&request.description)
        .bind(&request.location)
        .bind(request.submission_date)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(permit)
    }
}
