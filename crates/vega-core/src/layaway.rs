//! # Layaway Ledger
//!
//! Deferred-payment purchases: the customer pays in installments and takes
//! the item once the balance reaches zero.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► ACTIVE ──payment brings balance to 0──► PAID ──► DELIVERED │
//! │                │                                      │                 │
//! │                └──────────── cancel(reason) ──────────┴──► CANCELLED    │
//! │                                                                         │
//! │  Invariants                                                             │
//! │  ├── balance = total_price − amount_paid  ≥ 0                           │
//! │  ├── amount_paid = Σ LayawayPayment.amount                              │
//! │  └── ACTIVE → PAID exactly when balance hits 0                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::{
    validate_non_negative_cents, validate_payment_amount, validate_reason, validate_required,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LayawayStatus {
    Active,
    Paid,
    Delivered,
    Cancelled,
}

impl fmt::Display for LayawayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LayawayStatus::Active => "active",
            LayawayStatus::Paid => "paid",
            LayawayStatus::Delivered => "delivered",
            LayawayStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One installment. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LayawayPayment {
    pub id: String,
    pub layaway_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LayawayPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Parameters for a new layaway.
#[derive(Debug, Clone)]
pub struct NewLayaway {
    pub id: String,
    pub number: String,
    pub customer_id: String,
    pub variant_id: String,
    pub store_id: String,
    pub total_price: Money,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Layaway {
    pub id: String,
    /// `L-YYYYMMDD-NNNN`.
    pub number: String,
    pub customer_id: String,
    pub variant_id: String,
    pub store_id: String,
    pub status: LayawayStatus,
    pub total_price_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_cents: i64,
    pub cancel_reason: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Layaway {
    /// Creates an active layaway and applies the initial payment.
    ///
    /// An initial payment equal to the total creates it already paid.
    pub fn new(params: NewLayaway, initial_payment: Money, now: DateTime<Utc>) -> CoreResult<Self> {
        validate_required("customer_id", &params.customer_id)?;
        validate_required("variant_id", &params.variant_id)?;
        validate_required("store_id", &params.store_id)?;
        if !params.total_price.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "total price".to_string(),
            }
            .into());
        }
        validate_non_negative_cents("initial payment", initial_payment.cents())?;
        if initial_payment > params.total_price {
            return Err(CoreError::Overpayment {
                balance_cents: params.total_price.cents(),
                attempted_cents: initial_payment.cents(),
            });
        }

        let mut layaway = Layaway {
            id: params.id,
            number: params.number,
            customer_id: params.customer_id,
            variant_id: params.variant_id,
            store_id: params.store_id,
            status: LayawayStatus::Active,
            total_price_cents: params.total_price.cents(),
            amount_paid_cents: 0,
            balance_cents: params.total_price.cents(),
            cancel_reason: None,
            created_by: params.created_by,
            created_at: now,
            paid_at: None,
            delivered_at: None,
            cancelled_at: None,
        };
        layaway.set_amount_paid(initial_payment, now);
        Ok(layaway)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Checks a prospective payment without applying it.
    pub fn check_payment(&self, amount: Money) -> CoreResult<()> {
        self.require_status(LayawayStatus::Active)?;
        validate_payment_amount(amount.cents())?;
        if amount > self.balance() {
            return Err(CoreError::Overpayment {
                balance_cents: self.balance_cents,
                attempted_cents: amount.cents(),
            });
        }
        Ok(())
    }

    /// Applies one installment.
    pub fn apply_payment(&mut self, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        self.check_payment(amount)?;
        self.set_amount_paid(self.amount_paid() + amount, now);
        Ok(())
    }

    /// Rebuilds the running totals from the full payment history.
    pub fn recompute_from_ledger(&mut self, payments: &[LayawayPayment], now: DateTime<Utc>) -> CoreResult<()> {
        let paid: Money = payments.iter().map(LayawayPayment::amount).sum();
        if paid > self.total_price() {
            return Err(CoreError::Overpayment {
                balance_cents: self.total_price_cents,
                attempted_cents: paid.cents(),
            });
        }
        self.set_amount_paid(paid, now);
        Ok(())
    }

    /// paid → delivered.
    pub fn deliver(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.require_status(LayawayStatus::Paid)?;
        self.status = LayawayStatus::Delivered;
        self.delivered_at = Some(now);
        Ok(())
    }

    /// active | paid → cancelled.
    pub fn cancel(&mut self, reason: &str, now: DateTime<Utc>) -> CoreResult<()> {
        if matches!(self.status, LayawayStatus::Delivered | LayawayStatus::Cancelled) {
            return Err(self.invalid_status());
        }
        validate_reason(reason)?;

        self.status = LayawayStatus::Cancelled;
        self.cancel_reason = Some(reason.trim().to_string());
        self.cancelled_at = Some(now);
        Ok(())
    }

    pub fn require_status(&self, wanted: LayawayStatus) -> CoreResult<()> {
        if self.status != wanted {
            return Err(self.invalid_status());
        }
        Ok(())
    }

    fn invalid_status(&self) -> CoreError {
        CoreError::InvalidLayawayStatus {
            layaway_id: self.id.clone(),
            status: self.status.to_string(),
        }
    }

    // Single place that writes amount_paid, balance and the paid transition.
    fn set_amount_paid(&mut self, paid: Money, now: DateTime<Utc>) {
        self.amount_paid_cents = paid.cents();
        self.balance_cents = (self.total_price() - paid).cents();
        if self.status == LayawayStatus::Active && self.balance_cents == 0 {
            self.status = LayawayStatus::Paid;
            self.paid_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(total: i64) -> NewLayaway {
        NewLayaway {
            id: "l1".to_string(),
            number: "L-20261017-0001".to_string(),
            customer_id: "c1".to_string(),
            variant_id: "v1".to_string(),
            store_id: "store".to_string(),
            total_price: Money::from_cents(total),
            created_by: "ana".to_string(),
        }
    }

    fn payment(id: &str, cents: i64) -> LayawayPayment {
        LayawayPayment {
            id: id.to_string(),
            layaway_id: "l1".to_string(),
            amount_cents: cents,
            method: PaymentMethod::Cash,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_with_partial_initial_payment() {
        let layaway = Layaway::new(params(100_000), Money::from_cents(30_000), Utc::now()).unwrap();
        assert_eq!(layaway.status, LayawayStatus::Active);
        assert_eq!(layaway.amount_paid_cents, 30_000);
        assert_eq!(layaway.balance_cents, 70_000);
    }

    #[test]
    fn test_create_rejects_bad_amounts() {
        assert!(matches!(
            Layaway::new(params(100_000), Money::from_cents(100_001), Utc::now()),
            Err(CoreError::Overpayment { .. })
        ));
        assert!(Layaway::new(params(0), Money::zero(), Utc::now()).is_err());
        assert!(Layaway::new(params(1_000), Money::from_cents(-1), Utc::now()).is_err());
    }

    #[test]
    fn test_full_initial_payment_is_paid_immediately() {
        let layaway = Layaway::new(params(5_000), Money::from_cents(5_000), Utc::now()).unwrap();
        assert_eq!(layaway.status, LayawayStatus::Paid);
        assert!(layaway.paid_at.is_some());
    }

    #[test]
    fn test_payments_reach_paid_exactly_at_zero() {
        let mut layaway = Layaway::new(params(100_000), Money::from_cents(30_000), Utc::now()).unwrap();

        layaway.apply_payment(Money::from_cents(69_999), Utc::now()).unwrap();
        assert_eq!(layaway.status, LayawayStatus::Active);
        assert_eq!(layaway.balance_cents, 1);

        layaway.apply_payment(Money::from_cents(1), Utc::now()).unwrap();
        assert_eq!(layaway.status, LayawayStatus::Paid);
        assert_eq!(layaway.balance(), Money::zero());
    }

    #[test]
    fn test_payment_rules() {
        let mut layaway = Layaway::new(params(10_000), Money::zero(), Utc::now()).unwrap();
        assert!(layaway.apply_payment(Money::zero(), Utc::now()).is_err());
        assert!(matches!(
            layaway.apply_payment(Money::from_cents(10_001), Utc::now()),
            Err(CoreError::Overpayment { balance_cents: 10_000, attempted_cents: 10_001 })
        ));

        layaway.apply_payment(Money::from_cents(10_000), Utc::now()).unwrap();
        assert!(matches!(
            layaway.apply_payment(Money::from_cents(1), Utc::now()),
            Err(CoreError::InvalidLayawayStatus { .. })
        ));
    }

    #[test]
    fn test_recompute_from_ledger() {
        let mut layaway = Layaway::new(params(10_000), Money::zero(), Utc::now()).unwrap();
        layaway
            .recompute_from_ledger(&[payment("a", 4_000), payment("b", 6_000)], Utc::now())
            .unwrap();
        assert_eq!(layaway.amount_paid_cents, 10_000);
        assert_eq!(layaway.status, LayawayStatus::Paid);

        let mut other = Layaway::new(params(10_000), Money::zero(), Utc::now()).unwrap();
        assert!(other
            .recompute_from_ledger(&[payment("a", 10_001)], Utc::now())
            .is_err());
    }

    #[test]
    fn test_deliver_requires_paid() {
        let mut layaway = Layaway::new(params(10_000), Money::zero(), Utc::now()).unwrap();
        assert!(layaway.deliver(Utc::now()).is_err());

        layaway.apply_payment(Money::from_cents(10_000), Utc::now()).unwrap();
        layaway.deliver(Utc::now()).unwrap();
        assert_eq!(layaway.status, LayawayStatus::Delivered);
        assert!(layaway.cancel("too late", Utc::now()).is_err());
    }

    #[test]
    fn test_cancel_requires_reason() {
        let mut layaway = Layaway::new(params(10_000), Money::zero(), Utc::now()).unwrap();
        assert!(layaway.cancel("  ", Utc::now()).is_err());

        layaway.cancel("customer moved away", Utc::now()).unwrap();
        assert_eq!(layaway.status, LayawayStatus::Cancelled);
        assert_eq!(layaway.cancel_reason.as_deref(), Some("customer moved away"));
        assert!(layaway.apply_payment(Money::from_cents(1), Utc::now()).is_err());
    }
}
