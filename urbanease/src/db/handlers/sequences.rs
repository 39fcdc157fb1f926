//! Atomic counters behind the human readable identifiers.

use crate::db::{errors::Result, models::sequences::SequenceKind};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Sequences<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Sequences<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Advance the counter for `kind` and return the formatted identifier.
    ///
    /// The upsert takes a row lock on the counter, so concurrent callers serialize on it and
    /// never see the same value. When called inside a transaction that later rolls back, the
    /// increment rolls back too.
    #[instrument(skip(self), fields(kind = %kind), err)]
    pub async fn next(&mut self, kind: SequenceKind) -> Result<String> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sequence_counters (prefix, value) VALUES ($1, 1)
            ON CONFLICT (prefix) DO UPDATE SET value = sequence_counters.value + 1
            RETURNING value
            "#,
        )
        .bind(kind.prefix())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(kind.format(value))
    }
}
