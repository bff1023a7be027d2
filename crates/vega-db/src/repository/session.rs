//! # Cash Session Repository
//!
//! Persists register sessions and runs the drawer-close aggregation.
//!
//! ## Close Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    load session             → NotFound / InvalidSessionStatus           │
//! │    Σ cash payments on completed sales for this session                  │
//! │         (query failure      → AggregationFailure, session stays open)   │
//! │    CashSession::close(closing, expected)                                │
//! │    UPDATE ... WHERE status = 'open'   (0 rows → Conflict)               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One open session per cashier is enforced by a partial unique index, so
//! two terminals racing to open for the same cashier cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vega_core::session::{CashSession, SessionStatus};
use vega_core::{CoreError, Money};

const SELECT_SESSION: &str = r#"
    SELECT id, register_id, cashier_id, status, opening_cash_cents, closing_cash_cents,
           expected_cash_cents, difference_cents, opened_at, closed_at
    FROM cash_sessions
"#;

/// Repository for cash session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Opens a session for a cashier at a register.
    pub async fn open(
        &self,
        register_id: &str,
        cashier_id: &str,
        opening_cash: Money,
        now: DateTime<Utc>,
    ) -> DbResult<CashSession> {
        let session = CashSession::open(Uuid::new_v4().to_string(), register_id, cashier_id, opening_cash, now)?;

        let result = sqlx::query(
            r#"
            INSERT INTO cash_sessions (id, register_id, cashier_id, status, opening_cash_cents, opened_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&session.id)
        .bind(&session.register_id)
        .bind(&session.cashier_id)
        .bind(session.status)
        .bind(session.opening_cash_cents)
        .bind(session.opened_at)
        .execute(&self.pool)
        .await;

        match result.map_err(DbError::from) {
            Ok(_) => {}
            Err(DbError::UniqueViolation { field, .. }) if field.contains("cash_sessions") => {
                warn!(cashier_id = %cashier_id, "Rejected second open session");
                return Err(CoreError::SessionAlreadyOpen {
                    cashier_id: cashier_id.to_string(),
                }
                .into());
            }
            Err(err) => return Err(err),
        }

        info!(
            session_id = %session.id,
            register_id = %register_id,
            cashier_id = %cashier_id,
            opening = %opening_cash,
            "Cash session opened"
        );
        Ok(session)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let session = sqlx::query_as::<_, CashSession>(&format!("{SELECT_SESSION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    /// The cashier's open session, if any.
    pub async fn current_for_cashier(&self, cashier_id: &str) -> DbResult<Option<CashSession>> {
        let session = sqlx::query_as::<_, CashSession>(&format!(
            "{SELECT_SESSION} WHERE cashier_id = ?1 AND status = 'open'"
        ))
        .bind(cashier_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// Opening cash plus cash taken on completed sales so far. Read-only.
    pub async fn compute_expected_cash(&self, session_id: &str) -> DbResult<Money> {
        let session = self
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", session_id))?;

        let mut conn = self.pool.acquire().await?;
        let takings = cash_takings(&mut conn, session_id).await?;
        Ok(vega_core::session::expected_cash(session.opening_cash(), [takings]))
    }

    /// Closes a session with the counted drawer amount.
    pub async fn close(&self, session_id: &str, closing_cash: Money, now: DateTime<Utc>) -> DbResult<CashSession> {
        let mut tx = self.pool.begin().await?;

        let mut session = fetch_session(&mut tx, session_id).await?;
        session.require_status(SessionStatus::Open)?;

        let expected = match cash_takings(&mut tx, session_id).await {
            Ok(takings) => Some(vega_core::session::expected_cash(session.opening_cash(), [takings])),
            Err(err) if err.is_retryable() => return Err(err),
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Expected cash aggregation failed");
                return Err(CoreError::AggregationFailure {
                    session_id: session_id.to_string(),
                    reason: err.to_string(),
                }
                .into());
            }
        };

        session.close(closing_cash, expected, now)?;

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions
               SET status = ?2, closing_cash_cents = ?3, expected_cash_cents = ?4,
                   difference_cents = ?5, closed_at = ?6
             WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(&session.id)
        .bind(session.status)
        .bind(session.closing_cash_cents)
        .bind(session.expected_cash_cents)
        .bind(session.difference_cents)
        .bind(session.closed_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!("cash session {session_id} changed while closing")));
        }

        tx.commit().await?;

        info!(
            session_id = %session.id,
            expected = session.expected_cash_cents,
            closing = session.closing_cash_cents,
            difference = session.difference_cents,
            "Cash session closed"
        );
        Ok(session)
    }

    /// closed → reconciled.
    pub async fn mark_reconciled(&self, session_id: &str) -> DbResult<CashSession> {
        let mut tx = self.pool.begin().await?;

        let mut session = fetch_session(&mut tx, session_id).await?;
        session.mark_reconciled()?;

        let result = sqlx::query("UPDATE cash_sessions SET status = ?2 WHERE id = ?1 AND status = 'closed'")
            .bind(&session.id)
            .bind(session.status)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!("cash session {session_id} changed while reconciling")));
        }

        tx.commit().await?;
        info!(session_id = %session_id, "Cash session reconciled");
        Ok(session)
    }
}

async fn fetch_session(conn: &mut SqliteConnection, session_id: &str) -> DbResult<CashSession> {
    sqlx::query_as::<_, CashSession>(&format!("{SELECT_SESSION} WHERE id = ?1"))
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("CashSession", session_id))
}

/// Σ completed cash payments on completed sales of the session.
async fn cash_takings(conn: &mut SqliteConnection, session_id: &str) -> DbResult<Money> {
    let cents: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(p.amount_cents), 0)
        FROM payments p
        JOIN sales s ON s.id = p.sale_id
        WHERE s.session_id = ?1
          AND s.status = 'completed'
          AND p.method = 'cash'
          AND p.status = 'completed'
        "#,
    )
    .bind(session_id)
    .fetch_one(&mut *conn)
    .await?;

    debug!(session_id = %session_id, cents, "Aggregated cash takings");
    Ok(Money::from_cents(cents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_open_and_current() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = db
            .sessions()
            .open("reg-1", "ana", Money::from_cents(50_000), Utc::now())
            .await
            .unwrap();

        let current = db.sessions().current_for_cashier("ana").await.unwrap().unwrap();
        assert_eq!(current.id, session.id);
        assert!(current.is_open());
        assert!(db.sessions().current_for_cashier("luis").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_open_session_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.sessions().open("reg-1", "ana", Money::zero(), Utc::now()).await.unwrap();

        let err = db
            .sessions()
            .open("reg-2", "ana", Money::zero(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SessionAlreadyOpen { .. })));

        // A different cashier is unaffected.
        db.sessions().open("reg-2", "luis", Money::zero(), Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_open_rejects_missing_register_and_negative_cash() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.sessions().open("", "ana", Money::zero(), Utc::now()).await.is_err());
        assert!(db
            .sessions()
            .open("reg-1", "ana", Money::from_cents(-1), Utc::now())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_close_without_sales() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = db
            .sessions()
            .open("reg-1", "ana", Money::from_cents(50_000), Utc::now())
            .await
            .unwrap();

        assert_eq!(
            db.sessions().compute_expected_cash(&session.id).await.unwrap(),
            Money::from_cents(50_000)
        );

        let closed = db
            .sessions()
            .close(&session.id, Money::from_cents(49_500), Utc::now())
            .await
            .unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.expected_cash_cents, Some(50_000));
        assert_eq!(closed.difference_cents, Some(-500));

        // Closing twice fails and leaves the stored figures alone.
        let err = db
            .sessions()
            .close(&session.id, Money::from_cents(1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidSessionStatus { .. })));

        let stored = db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.closing_cash_cents, Some(49_500));

        // The cashier can open again.
        db.sessions().open("reg-1", "ana", Money::zero(), Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_aggregation_leaves_session_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = db
            .sessions()
            .open("reg-1", "ana", Money::from_cents(50_000), Utc::now())
            .await
            .unwrap();

        // Takings can no longer be summed.
        sqlx::query("DROP TABLE payments").execute(db.pool()).await.unwrap();

        let err = db
            .sessions()
            .close(&session.id, Money::from_cents(50_000), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AggregationFailure { ref session_id, .. }) if *session_id == session.id
        ));
        assert!(!err.is_retryable());

        let (status, expected, closing): (String, Option<i64>, Option<i64>) = sqlx::query_as(
            "SELECT status, expected_cash_cents, closing_cash_cents FROM cash_sessions WHERE id = ?1",
        )
        .bind(&session.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(status, "open");
        assert_eq!(expected, None);
        assert_eq!(closing, None);
    }

    #[tokio::test]
    async fn test_mark_reconciled_requires_closed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = db.sessions().open("reg-1", "ana", Money::zero(), Utc::now()).await.unwrap();

        assert!(db.sessions().mark_reconciled(&session.id).await.is_err());

        db.sessions().close(&session.id, Money::zero(), Utc::now()).await.unwrap();
        let reconciled = db.sessions().mark_reconciled(&session.id).await.unwrap();
        assert_eq!(reconciled.status, SessionStatus::Reconciled);
    }

    #[tokio::test]
    async fn test_close_unknown_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.sessions().close("nope", Money::zero(), Utc::now()).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
