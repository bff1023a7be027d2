//! # Sale Commit Engine
//!
//! Turns a finalized cart and a tender into a completed sale.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CommitRequest { cart, tender, customer, session_id, cashier_id }       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate cart          → EmptyCart / Validation                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  re-price: active promotions + configured tax policy                    │
//! │       │   (totals shown by the UI are never trusted)                    │
//! │       ▼                                                                 │
//! │  tender.settle(total)   → InvalidPayment / Validation                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleRepository::commit ── Conflict ──► sleep(next_backoff) ──► retry   │
//! │       │                   (up to checkout.max_commit_attempts)          │
//! │       ▼                                                                 │
//! │  CommittedSale                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use backoff::backoff::Backoff;
use tracing::{debug, warn};

use crate::config::PosConfig;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::sale::{CommittedSale, SaleDraft};
use vega_core::cart::{Cart, CartQuote};
use vega_core::tender::Tender;
use vega_core::validation::{validate_required, validate_uuid};
use vega_core::{Clock, CoreError, SaleCustomer};

/// Input for [`SaleCommitEngine::commit`].
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub cart: Cart,
    pub tender: Tender,
    pub customer: SaleCustomer,
    pub session_id: Option<String>,
    pub cashier_id: String,
}

/// Atomic sale commit with conflict retry.
#[derive(Clone)]
pub struct SaleCommitEngine {
    db: Database,
    config: PosConfig,
    clock: Arc<dyn Clock>,
}

impl SaleCommitEngine {
    pub fn new(db: Database, config: PosConfig, clock: Arc<dyn Clock>) -> Self {
        SaleCommitEngine { db, config, clock }
    }

    /// Prices a cart against the current promotion set. Nothing is written.
    pub async fn quote(&self, cart: &Cart) -> DbResult<CartQuote> {
        let now = self.clock.now();
        let promotions = self.db.promotions().list_active(now).await?;
        Ok(cart.recompute(&promotions, self.config.tax.policy(), now))
    }

    /// Commits the cart as a completed sale.
    pub async fn commit(&self, request: CommitRequest) -> DbResult<CommittedSale> {
        if request.cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        for line in request.cart.lines() {
            line.validate()?;
        }
        validate_required("cashier_id", &request.cashier_id)?;
        if let Some(session_id) = &request.session_id {
            validate_uuid("session_id", session_id)?;
        }
        if let SaleCustomer::Quick(name) = &request.customer {
            validate_required("quick customer name", name)?;
        }

        let quote = self.quote(&request.cart).await?;
        let settlement = request.tender.settle(quote.totals.total, &request.customer)?;

        debug!(
            subtotal = %quote.totals.subtotal,
            discount = %quote.totals.discount,
            tax = %quote.totals.tax,
            total = %quote.totals.total,
            promotion_id = ?quote.totals.promotion_id,
            "Cart priced for commit"
        );

        let mut draft = SaleDraft {
            store_id: self.config.store.id.clone(),
            terminal_code: self.config.store.terminal_code.clone(),
            cashier_id: request.cashier_id,
            session_id: request.session_id,
            customer: request.customer,
            lines: request.cart.lines().to_vec(),
            totals: quote.totals,
            tender: request.tender,
            settlement,
            now: self.clock.now(),
        };

        let max_attempts = self.config.checkout.max_commit_attempts.max(1);
        let mut backoff = self.config.checkout.backoff();
        let mut attempt = 1;
        loop {
            match self.db.sales().commit(&draft).await {
                Ok(committed) => return Ok(committed),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
                    warn!(attempt, max_attempts, ?delay, error = %err, "Sale commit conflicted, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    draft.now = self.clock.now();
                }
                Err(err) if err.is_retryable() => {
                    warn!(attempts = attempt, error = %err, "Sale commit gave up after conflicts");
                    return Err(DbError::conflict(format!(
                        "sale commit failed after {attempt} attempts: {err}"
                    )));
                }
                Err(err) => {
                    if err.as_domain().is_some() {
                        warn!(error = %err, "Sale commit rejected");
                    }
                    return Err(err);
                }
            }
        }
    }
}
