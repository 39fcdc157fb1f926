//! Database repository for the admin audit log.

use crate::types::{AdminLogId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::admin_logs::{AdminLogCreateDBRequest, AdminLogDBResponse, AdminLogUpdateDBRequest},
};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

pub struct AdminLogs<'c> {
    db: &'c mut PgConnection,
}

impl<'c> AdminLogs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for AdminLogs<'c> {
    type CreateRequest = AdminLogCreateDBRequest;
    type UpdateRequest = AdminLogUpdateDBRequest;
    type Response = AdminLogDBResponse;
    type Id = AdminLogId;
    type Filter = ();

    #[instrument(skip(self, request), fields(admin_id = %abbrev_uuid(&request.admin_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let log = sqlx::query_as::<_, AdminLogDBResponse>(
            "INSERT INTO admin_logs (id, admin_id, action) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(request.admin_id)
        .bind(&request.action)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(log)
    }

    #[instrument(skip(self), fields(log_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let log = sqlx::query_as::<_, AdminLogDBResponse>("SELECT * FROM admin_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(log)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<AdminLogId>) -> Result<HashMap<Self::Id, AdminLogDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let logs = sqlx::query_as::<_, AdminLogDBResponse>("SELECT * FROM admin_logs WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(logs.into_iter().map(|l| (l.id, l)).collect())
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let logs = sqlx::query_as::<_, AdminLogDBResponse>("SELECT * FROM admin_logs ORDER BY created_at, id")
            .fetch_all(&mut *self.db)
            .await?;

        Ok(logs)
    }

    #[instrument(skip(self), fields(log_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admin_logs WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(log_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let log = sqlx::query_as::<_, AdminLogDBResponse>("UPDATE admin_logs SET action = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(&request.action)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(log)
    }
}
