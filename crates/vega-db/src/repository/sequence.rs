//! # Number Sequences
//!
//! Counters behind sale and layaway numbers. Allocation is an UPSERT with
//! RETURNING, so it runs as one statement inside the caller's transaction:
//! a rolled-back commit gives its number back.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Increments and returns the counter for `key`, starting at 1.
pub(crate) async fn next_value(conn: &mut SqliteConnection, key: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO number_sequences (key, last_value)
        VALUES (?1, 1)
        ON CONFLICT (key) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(key)
    .fetch_one(&mut *conn)
    .await?;

    debug!(key = %key, value, "Allocated sequence value");
    Ok(value)
}

/// Last value handed out for `key`, or 0.
pub async fn current_value(pool: &SqlitePool, key: &str) -> DbResult<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT last_value FROM number_sequences WHERE key = ?1")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.unwrap_or(0))
}
