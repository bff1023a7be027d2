//! # Cash Session State Machine
//!
//! Governs a register drawer's lifecycle and the expected-cash figure used
//! at close.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   (none) ──open(opening_cash)──► OPEN ──close(closing_cash)──► CLOSED   │
//! │                                    │                              │     │
//! │                                    │  expected = opening          │     │
//! │                                    │    + Σ cash payments of      │     │
//! │                                    │      completed sales in      │     │
//! │                                    │      this session            │     │
//! │                                    │  difference =                │     │
//! │                                    │    closing − expected        │     │
//! │                                                                   ▼     │
//! │                                             mark_reconciled ► RECONCILED│
//! │                                                                         │
//! │  A non-zero difference never blocks close. A missing expected figure   │
//! │  always does.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_non_negative_cents, validate_required};

// =============================================================================
// Session Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
    Reconciled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
            SessionStatus::Reconciled => "reconciled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Cash Session
// =============================================================================

/// A register drawer shift.
///
/// `closing_cash_cents`, `expected_cash_cents`, `difference_cents` and
/// `closed_at` are set together, once, at close.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub register_id: String,
    pub cashier_id: String,
    pub status: SessionStatus,
    pub opening_cash_cents: i64,
    pub closing_cash_cents: Option<i64>,
    pub expected_cash_cents: Option<i64>,
    pub difference_cents: Option<i64>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashSession {
    /// Opens a new session. Does not check for other open sessions; that is
    /// enforced where sessions are stored.
    pub fn open(
        id: impl Into<String>,
        register_id: &str,
        cashier_id: &str,
        opening_cash: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_required("register_id", register_id)?;
        validate_required("cashier_id", cashier_id)?;
        validate_non_negative_cents("opening cash", opening_cash.cents())?;

        Ok(CashSession {
            id: id.into(),
            register_id: register_id.to_string(),
            cashier_id: cashier_id.to_string(),
            status: SessionStatus::Open,
            opening_cash_cents: opening_cash.cents(),
            closing_cash_cents: None,
            expected_cash_cents: None,
            difference_cents: None,
            opened_at: now,
            closed_at: None,
        })
    }

    #[inline]
    pub fn opening_cash(&self) -> Money {
        Money::from_cents(self.opening_cash_cents)
    }

    pub fn expected_cash(&self) -> Option<Money> {
        self.expected_cash_cents.map(Money::from_cents)
    }

    pub fn difference(&self) -> Option<Money> {
        self.difference_cents.map(Money::from_cents)
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Closes the session with the operator's count.
    ///
    /// `expected` is the aggregated figure; `None` means aggregation failed
    /// and the session must stay open.
    pub fn close(
        &mut self,
        closing_cash: Money,
        expected: Option<Money>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.require_status(SessionStatus::Open)?;
        validate_non_negative_cents("closing cash", closing_cash.cents())?;

        let expected = expected.ok_or_else(|| CoreError::AggregationFailure {
            session_id: self.id.clone(),
            reason: "expected cash was not computed".to_string(),
        })?;

        self.status = SessionStatus::Closed;
        self.closing_cash_cents = Some(closing_cash.cents());
        self.expected_cash_cents = Some(expected.cents());
        self.difference_cents = Some((closing_cash - expected).cents());
        self.closed_at = Some(now);
        Ok(())
    }

    /// closed → reconciled.
    pub fn mark_reconciled(&mut self) -> CoreResult<()> {
        self.require_status(SessionStatus::Closed)?;
        self.status = SessionStatus::Reconciled;
        Ok(())
    }

    pub fn variance(&self) -> Option<CashVariance> {
        self.difference().map(CashVariance::from_difference)
    }

    pub fn require_status(&self, wanted: SessionStatus) -> CoreResult<()> {
        if self.status != wanted {
            return Err(CoreError::InvalidSessionStatus {
                session_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }
}

/// opening + Σ cash payments.
///
/// The caller supplies only cash payments on completed sales of the session.
pub fn expected_cash(opening: Money, cash_payments: impl IntoIterator<Item = Money>) -> Money {
    opening + cash_payments.into_iter().sum::<Money>()
}

// =============================================================================
// Variance
// =============================================================================

/// How the drawer count compares with the expected figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "cents", rename_all = "snake_case")]
pub enum CashVariance {
    Balanced,
    /// Drawer holds less than expected.
    Short(i64),
    /// Drawer holds more than expected.
    Over(i64),
}

impl CashVariance {
    pub fn from_difference(difference: Money) -> Self {
        if difference.is_zero() {
            CashVariance::Balanced
        } else if difference.is_negative() {
            CashVariance::Short(difference.abs().cents())
        } else {
            CashVariance::Over(difference.cents())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_session(opening: i64) -> CashSession {
        CashSession::open("s1", "REG-01", "ana", Money::from_cents(opening), Utc::now()).unwrap()
    }

    #[test]
    fn test_open_requires_register_and_non_negative_cash() {
        assert!(CashSession::open("s", "", "ana", Money::zero(), Utc::now()).is_err());
        assert!(CashSession::open("s", "REG-01", "", Money::zero(), Utc::now()).is_err());
        assert!(CashSession::open("s", "REG-01", "ana", Money::from_cents(-1), Utc::now()).is_err());
        assert!(open_session(0).is_open());
    }

    #[test]
    fn test_expected_cash_is_order_independent() {
        let opening = Money::from_cents(50_000);
        let a = expected_cash(opening, [Money::from_cents(15_000), Money::from_cents(7_500)]);
        let b = expected_cash(opening, [Money::from_cents(7_500), Money::from_cents(15_000)]);
        assert_eq!(a, b);
        assert_eq!(a.cents(), 72_500);
        assert_eq!(expected_cash(opening, []), opening);
    }

    #[test]
    fn test_close_records_difference() {
        let mut session = open_session(50_000);
        session
            .close(Money::from_cents(72_000), Some(Money::from_cents(72_500)), Utc::now())
            .unwrap();

        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.expected_cash_cents, Some(72_500));
        assert_eq!(session.difference_cents, Some(-500));
        assert_eq!(session.variance(), Some(CashVariance::Short(500)));
        assert!(session.closed_at.is_some());
    }

    #[test]
    fn test_close_without_expected_fails_and_stays_open() {
        let mut session = open_session(50_000);
        let err = session.close(Money::from_cents(50_000), None, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::AggregationFailure { .. }));
        assert!(session.is_open());
        assert!(session.difference_cents.is_none());
    }

    #[test]
    fn test_close_twice_is_rejected() {
        let mut session = open_session(0);
        session.close(Money::zero(), Some(Money::zero()), Utc::now()).unwrap();
        let err = session.close(Money::zero(), Some(Money::zero()), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSessionStatus { .. }));
    }

    #[test]
    fn test_reconcile_only_from_closed() {
        let mut session = open_session(0);
        assert!(session.mark_reconciled().is_err());

        session.close(Money::zero(), Some(Money::zero()), Utc::now()).unwrap();
        session.mark_reconciled().unwrap();
        assert_eq!(session.status, SessionStatus::Reconciled);
        assert!(session.mark_reconciled().is_err());
    }

    #[test]
    fn test_variance_classification() {
        assert_eq!(CashVariance::from_difference(Money::zero()), CashVariance::Balanced);
        assert_eq!(CashVariance::from_difference(Money::from_cents(250)), CashVariance::Over(250));
        assert_eq!(CashVariance::from_difference(Money::from_cents(-250)), CashVariance::Short(250));
    }
}
