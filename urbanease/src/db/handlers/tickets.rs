//! Database repository for service requests (tickets).

use crate::types::{TicketId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::{repository::Repository, sequences::Sequences},
    models::{
        sequences::SequenceKind,
        tickets::{TicketCreateDBRequest, TicketDBResponse, TicketUpdateDBRequest},
    },
};
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

pub struct Tickets<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Tickets<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Tickets<'c> {
    type CreateRequest = TicketCreateDBRequest;
    type UpdateRequest = TicketUpdateDBRequest;
    type Response = TicketDBResponse;
    type Id = TicketId;
    type Filter = ();

    /// Allocates the `TKT-` id and inserts the ticket in one transaction.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), priority = %request.priority), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let ticket_id = Sequences::new(&mut tx).next(SequenceKind::Ticket).await?;
        let ticket = sqlx::query_as::<_, TicketDBResponse>(
            r#"
            INSERT INTO tickets (id, ticket_id, user_id, ticket_type, location, description, priority, assigned_to, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&ticket_id)
        .bind(request.user_id)
        .bind(&request.ticket_type)
        .bind(&request.location)
        .bind(&request.description)
        .bind(request.priority)
        .bind(&request.assigned_to)
        .bind(request.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ticket)
    }

    #[instrument(skip(self), fields(ticket_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let ticket = sqlx::query_as::<_, TicketDBResponse>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(ticket)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<TicketId>) -> Result<HashMap<Self::Id, TicketDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let tickets = sqlx::query_as::<_, TicketDBResponse>("SELECT * FROM tickets WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(tickets.into_iter().map(|t| (t.id, t)).collect())
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let tickets = sqlx::query_as::<_, TicketDBResponse>("SELECT * FROM tickets ORDER BY created_at, id")
            .fetch_all(&mut *self.db)
            .await?;

        Ok(tickets)
    }

    #[instrument(skip(self), fields(ticket_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(ticket_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let ticket = sqlx::query_as::<_, TicketDBResponse>(
            r#"
            UPDATE tickets SET
                ticket_type = $2,
                location = $3,
                description = $4,
                priority = $5,
                assigned_to = $6,
                status = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.ticket_type)
        .bind(&request.location)
        .bind(&request.description)
        .bind(request.priority)
        .bind(&request.assigned_to)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(ticket)
    }
}
