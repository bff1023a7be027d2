//! # Cash Register
//!
//! Drawer shifts for a cashier: open with a counted float, close with a
//! counted drawer, reconcile afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use vega_core::session::{CashSession, CashVariance};
use vega_core::{Clock, Money};

/// Result of closing a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClose {
    pub session: CashSession,
    pub variance: CashVariance,
}

#[derive(Clone)]
pub struct CashRegister {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl CashRegister {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        CashRegister { db, clock }
    }

    pub async fn open_session(&self, register_id: &str, cashier_id: &str, opening_cash: Money) -> DbResult<CashSession> {
        self.db
            .sessions()
            .open(register_id, cashier_id, opening_cash, self.clock.now())
            .await
    }

    pub async fn current_session(&self, cashier_id: &str) -> DbResult<Option<CashSession>> {
        self.db.sessions().current_for_cashier(cashier_id).await
    }

    /// What the drawer should hold right now.
    pub async fn expected_cash(&self, session_id: &str) -> DbResult<Money> {
        self.db.sessions().compute_expected_cash(session_id).await
    }

    /// Closes the session. A non-zero difference is recorded, never refused.
    pub async fn close_session(&self, session_id: &str, closing_cash: Money) -> DbResult<SessionClose> {
        let session = self
            .db
            .sessions()
            .close(session_id, closing_cash, self.clock.now())
            .await?;

        let variance = session.variance().ok_or_else(|| DbError::CorruptData {
            entity: format!("CashSession {session_id}"),
            reason: "closed session has no difference".to_string(),
        })?;

        match variance {
            CashVariance::Balanced => info!(session_id = %session_id, "Drawer balanced"),
            CashVariance::Short(cents) => warn!(session_id = %session_id, cents, "Drawer short"),
            CashVariance::Over(cents) => warn!(session_id = %session_id, cents, "Drawer over"),
        }

        Ok(SessionClose { session, variance })
    }

    pub async fn mark_reconciled(&self, session_id: &str) -> DbResult<CashSession> {
        self.db.sessions().mark_reconciled(session_id).await
    }
}
