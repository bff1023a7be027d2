//! # Layaway Ledger
//!
//! Deferred-payment purchases: a customer reserves a variant, pays in
//! installments, and takes it home once paid.
//!
//! ## Lifecycle
//! ```text
//! create(initial) ──► active ──add_payment (balance → 0)──► paid ──deliver──► delivered
//!                       │                                     │
//!                       └────────────── cancel(reason) ───────┴──► cancelled
//! ```

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::config::PosConfig;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::layaway::LayawayRequest;
use vega_core::layaway::{Layaway, LayawayPayment};
use vega_core::validation::validate_uuid;
use vega_core::{Clock, Money, PaymentMethod};

#[derive(Clone)]
pub struct LayawayLedger {
    db: Database,
    config: PosConfig,
    clock: Arc<dyn Clock>,
}

impl LayawayLedger {
    pub fn new(db: Database, config: PosConfig, clock: Arc<dyn Clock>) -> Self {
        LayawayLedger { db, config, clock }
    }

    /// Opens a layaway at the configured store.
    pub async fn create(
        &self,
        customer_id: &str,
        variant_id: &str,
        total_price: Money,
        initial_payment: Money,
        method: PaymentMethod,
        created_by: &str,
    ) -> DbResult<Layaway> {
        let request = LayawayRequest {
            customer_id: customer_id.to_string(),
            variant_id: variant_id.to_string(),
            store_id: self.config.store.id.clone(),
            total_price,
            initial_payment,
            method,
            created_by: created_by.to_string(),
        };

        self.db
            .layaways()
            .create(&request, self.clock.now())
            .await
            .inspect_err(|err| log_rejection("create", err))
    }

    /// Records an installment. `payment_id` makes the call idempotent; when
    /// omitted a fresh id is generated.
    pub async fn add_payment(
        &self,
        layaway_id: &str,
        amount: Money,
        method: PaymentMethod,
        payment_id: Option<&str>,
    ) -> DbResult<Layaway> {
        let payment_id = match payment_id {
            Some(id) => {
                validate_uuid("payment_id", id)?;
                id.to_string()
            }
            None => Uuid::new_v4().to_string(),
        };

        self.db
            .layaways()
            .add_payment(layaway_id, &payment_id, amount, method, self.clock.now())
            .await
            .inspect_err(|err| log_rejection("add_payment", err))
    }

    pub async fn deliver(&self, layaway_id: &str) -> DbResult<Layaway> {
        self.db.layaways().deliver(layaway_id, self.clock.now()).await
    }

    pub async fn cancel(&self, layaway_id: &str, reason: &str) -> DbResult<Layaway> {
        self.db.layaways().cancel(layaway_id, reason, self.clock.now()).await
    }

    pub async fn get(&self, layaway_id: &str) -> DbResult<Layaway> {
        self.db
            .layaways()
            .get_by_id(layaway_id)
            .await?
            .ok_or_else(|| DbError::not_found("Layaway", layaway_id))
    }

    pub async fn history(&self, layaway_id: &str) -> DbResult<Vec<LayawayPayment>> {
        self.db.layaways().payments(layaway_id).await
    }

    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Layaway>> {
        self.db.layaways().list_for_customer(customer_id).await
    }
}

fn log_rejection(operation: &str, err: &DbError) {
    if err.as_domain().is_some() {
        warn!(operation, error = %err, "Layaway operation rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use chrono::{TimeZone, Utc};
    use vega_core::layaway::LayawayStatus;
    use vega_core::FixedClock;

    async fn ledger() -> (LayawayLedger, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();
        let customer = db.customers().insert("Ana", Money::zero(), now).await.unwrap();
        let ledger = LayawayLedger::new(db, PosConfig::default(), Arc::new(FixedClock::new(now)));
        (ledger, customer.id)
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (ledger, customer_id) = ledger().await;
        let layaway = ledger
            .create(&customer_id, "var-1", Money::from_cents(30_000), Money::from_cents(10_000), PaymentMethod::Cash, "ana")
            .await
            .unwrap();
        assert_eq!(layaway.store_id, "default-store");

        let layaway = ledger
            .add_payment(&layaway.id, Money::from_cents(20_000), PaymentMethod::Card, None)
            .await
            .unwrap();
        assert_eq!(layaway.status, LayawayStatus::Paid);

        let delivered = ledger.deliver(&layaway.id).await.unwrap();
        assert_eq!(delivered.status, LayawayStatus::Delivered);
        assert_eq!(ledger.history(&layaway.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_payment_id_must_be_uuid() {
        let (ledger, customer_id) = ledger().await;
        let layaway = ledger
            .create(&customer_id, "var-1", Money::from_cents(30_000), Money::zero(), PaymentMethod::Cash, "ana")
            .await
            .unwrap();

        assert!(ledger
            .add_payment(&layaway.id, Money::from_cents(100), PaymentMethod::Cash, Some("retry-1"))
            .await
            .is_err());

        let id = Uuid::new_v4().to_string();
        let first = ledger
            .add_payment(&layaway.id, Money::from_cents(100), PaymentMethod::Cash, Some(&id))
            .await
            .unwrap();
        let replay = ledger
            .add_payment(&layaway.id, Money::from_cents(100), PaymentMethod::Cash, Some(&id))
            .await
            .unwrap();
        assert_eq!(first.amount_paid_cents, replay.amount_paid_cents);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (ledger, _) = ledger().await;
        assert!(matches!(ledger.get("nope").await, Err(DbError::NotFound { .. })));
    }
}
