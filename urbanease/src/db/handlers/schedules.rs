//! Database repository for service schedules.

use crate::types::{ScheduleId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::schedules::{ScheduleDBRequest, ScheduleDBResponse},
};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

pub struct Schedules<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Schedules<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Schedules<'c> {
    type CreateRequest = ScheduleDBRequest;
    type UpdateRequest = ScheduleDBRequest;
    type Response = ScheduleDBResponse;
    type Id = ScheduleId;
    type Filter = ();

    #[instrument(skip(self, request), fields(service = %request.service), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let schedule = sqlx::query_as::<_, ScheduleDBResponse>(
            r#"
            INSERT INTO service_schedules (id, service, date_time, location, frequency, status, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.service)
        .bind(request.date_time)
        .bind(&request.location)
        .bind(&request.frequency)
        .bind(request.status)
        .bind(&request.description)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(schedule)
    }

    #[instrument(skip(self), fields(schedule_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let schedule = sqlx::query_as::<_, ScheduleDBResponse>("SELECT * FROM service_schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(schedule)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<ScheduleId>) -> Result<HashMap<Self::Id, ScheduleDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let schedules = sqlx::query_as::<_, ScheduleDBResponse>("SELECT * FROM service_schedules WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(schedules.into_iter().map(|s| (s.id, s)).collect())
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let schedules = sqlx::query_as::<_, ScheduleDBResponse>("SELECT * FROM service_schedules ORDER BY date_time, id")
            .fetch_all(&mut *self.db)
            .await?;

        Ok(schedules)
    }

    #[instrument(skip(self), fields(schedule_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM service_schedules WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(schedule_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let schedule = sqlx::query_as::<_, ScheduleDBResponse>(
            r#"
            UPDATE service_schedules SET
                service = $2,
                date_time = $3,
                location = $4,
                frequency = $5,
                status = $6,
                description = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.service)
        .bind(request.date_time)
        .bind(&request.location)
        .bind(&request.frequency)
        .bind(request.status)
        .bind(&request.description)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(schedule)
    }
}
