//! # Layaway Repository
//!
//! Layaways and their installment ledger.
//!
//! ## Add Payment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    payment id already stored?  → same layaway: return it unchanged      │
//! │                                  other layaway: UniqueViolation         │
//! │    load layaway + full ledger                                           │
//! │    recompute_from_ledger → apply_payment (Active, 0 < amt <= balance)   │
//! │    INSERT layaway_payments                                              │
//! │    UPDATE layaways ... WHERE amount_paid_cents = <loaded value>         │
//! │         (0 rows → Conflict)                                             │
//! │    store credit → debit customer                                        │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{customer, sequence};
use vega_core::layaway::{Layaway, LayawayPayment, LayawayStatus, NewLayaway};
use vega_core::numbering::{format_layaway_number, layaway_sequence_key};
use vega_core::validation::validate_required;
use vega_core::{Money, PaymentMethod};

/// Input for [`LayawayRepository::create`].
#[derive(Debug, Clone)]
pub struct LayawayRequest {
    pub customer_id: String,
    pub variant_id: String,
    pub store_id: String,
    pub total_price: Money,
    pub initial_payment: Money,
    pub method: PaymentMethod,
    pub created_by: String,
}

const SELECT_LAYAWAY: &str = r#"
    SELECT id, number, customer_id, variant_id, store_id, status, total_price_cents,
           amount_paid_cents, balance_cents, cancel_reason, created_by, created_at,
           paid_at, delivered_at, cancelled_at
    FROM layaways
"#;

/// Repository for layaway database operations.
#[derive(Debug, Clone)]
pub struct LayawayRepository {
    pool: SqlitePool,
}

impl LayawayRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LayawayRepository { pool }
    }

    /// Creates a layaway and records the initial payment, if any.
    pub async fn create(&self, request: &LayawayRequest, now: DateTime<Utc>) -> DbResult<Layaway> {
        validate_required("created_by", &request.created_by)?;

        let mut tx = self.pool.begin().await?;

        let day = now.date_naive();
        let seq = sequence::next_value(&mut tx, &layaway_sequence_key(day)).await?;

        customer::require_exists(&mut tx, &request.customer_id).await?;

        let layaway = Layaway::new(
            NewLayaway {
                id: Uuid::new_v4().to_string(),
                number: format_layaway_number(day, seq),
                customer_id: request.customer_id.clone(),
                variant_id: request.variant_id.clone(),
                store_id: request.store_id.clone(),
                total_price: request.total_price,
                created_by: request.created_by.clone(),
            },
            request.initial_payment,
            now,
        )?;
        insert_layaway(&mut tx, &layaway).await?;

        if request.initial_payment.is_positive() {
            let payment = LayawayPayment {
                id: Uuid::new_v4().to_string(),
                layaway_id: layaway.id.clone(),
                amount_cents: request.initial_payment.cents(),
                method: request.method,
                created_at: now,
            };
            insert_payment(&mut tx, &payment).await?;

            if request.method == PaymentMethod::StoreCredit {
                customer::debit_store_credit(&mut tx, &layaway.customer_id, payment.amount(), now).await?;
            }
        }

        tx.commit().await?;

        info!(
            layaway_id = %layaway.id,
            number = %layaway.number,
            total = %layaway.total_price(),
            paid = %layaway.amount_paid(),
            "Layaway created"
        );
        Ok(layaway)
    }

    /// Records one installment. Replaying `payment_id` is a no-op.
    pub async fn add_payment(
        &self,
        layaway_id: &str,
        payment_id: &str,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> DbResult<Layaway> {
        let mut tx = self.pool.begin().await?;

        let replayed: Option<String> =
            sqlx::query_scalar("SELECT layaway_id FROM layaway_payments WHERE id = ?1")
                .bind(payment_id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(owner) = replayed {
            if owner != layaway_id {
                return Err(DbError::duplicate("layaway_payments.id", payment_id));
            }
            let layaway = fetch_layaway(&mut tx, layaway_id).await?;
            debug!(layaway_id = %layaway_id, payment_id = %payment_id, "Replayed layaway payment ignored");
            return Ok(layaway);
        }

        let mut layaway = fetch_layaway(&mut tx, layaway_id).await?;
        let previous_paid = layaway.amount_paid_cents;

        let ledger = fetch_payments(&mut tx, layaway_id).await?;
        layaway.recompute_from_ledger(&ledger, now)?;
        if layaway.amount_paid_cents != previous_paid {
            return Err(DbError::CorruptData {
                entity: format!("Layaway {layaway_id}"),
                reason: format!(
                    "stored amount paid {previous_paid} disagrees with ledger total {}",
                    layaway.amount_paid_cents
                ),
            });
        }

        layaway.apply_payment(amount, now)?;

        let payment = LayawayPayment {
            id: payment_id.to_string(),
            layaway_id: layaway_id.to_string(),
            amount_cents: amount.cents(),
            method,
            created_at: now,
        };
        insert_payment(&mut tx, &payment).await?;

        let result = sqlx::query(
            r#"
            UPDATE layaways
               SET amount_paid_cents = ?2, balance_cents = ?3, status = ?4, paid_at = ?5
             WHERE id = ?1 AND amount_paid_cents = ?6
            "#,
        )
        .bind(&layaway.id)
        .bind(layaway.amount_paid_cents)
        .bind(layaway.balance_cents)
        .bind(layaway.status)
        .bind(layaway.paid_at)
        .bind(previous_paid)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!("layaway {layaway_id} changed while adding a payment")));
        }

        if method == PaymentMethod::StoreCredit {
            customer::debit_store_credit(&mut tx, &layaway.customer_id, amount, now).await?;
        }

        tx.commit().await?;

        info!(
            layaway_id = %layaway.id,
            amount = %amount,
            balance = %layaway.balance(),
            status = %layaway.status,
            "Layaway payment recorded"
        );
        Ok(layaway)
    }

    /// paid → delivered.
    pub async fn deliver(&self, layaway_id: &str, now: DateTime<Utc>) -> DbResult<Layaway> {
        let mut tx = self.pool.begin().await?;

        let mut layaway = fetch_layaway(&mut tx, layaway_id).await?;
        let previous = layaway.status;
        layaway.deliver(now)?;
        update_status(&mut tx, &layaway, previous).await?;

        tx.commit().await?;
        info!(layaway_id = %layaway_id, "Layaway delivered");
        Ok(layaway)
    }

    /// active | paid → cancelled.
    pub async fn cancel(&self, layaway_id: &str, reason: &str, now: DateTime<Utc>) -> DbResult<Layaway> {
        let mut tx = self.pool.begin().await?;

        let mut layaway = fetch_layaway(&mut tx, layaway_id).await?;
        let previous = layaway.status;
        layaway.cancel(reason, now)?;
        update_status(&mut tx, &layaway, previous).await?;

        tx.commit().await?;
        info!(layaway_id = %layaway_id, reason = %reason, "Layaway cancelled");
        Ok(layaway)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Layaway>> {
        let layaway = sqlx::query_as::<_, Layaway>(&format!("{SELECT_LAYAWAY} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(layaway)
    }

    /// Installment history, oldest first.
    pub async fn payments(&self, layaway_id: &str) -> DbResult<Vec<LayawayPayment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payments(&mut conn, layaway_id).await
    }

    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Layaway>> {
        let layaways = sqlx::query_as::<_, Layaway>(&format!(
            "{SELECT_LAYAWAY} WHERE customer_id = ?1 ORDER BY created_at DESC, number DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(layaways)
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

async fn fetch_layaway(conn: &mut SqliteConnection, layaway_id: &str) -> DbResult<Layaway> {
    sqlx::query_as::<_, Layaway>(&format!("{SELECT_LAYAWAY} WHERE id = ?1"))
        .bind(layaway_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Layaway", layaway_id))
}

async fn fetch_payments(conn: &mut SqliteConnection, layaway_id: &str) -> DbResult<Vec<LayawayPayment>> {
    let payments = sqlx::query_as::<_, LayawayPayment>(
        r#"
        SELECT id, layaway_id, amount_cents, method, created_at
        FROM layaway_payments
        WHERE layaway_id = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(layaway_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(payments)
}

async fn insert_layaway(conn: &mut SqliteConnection, layaway: &Layaway) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO layaways (
            id, number, customer_id, variant_id, store_id, status, total_price_cents,
            amount_paid_cents, balance_cents, created_by, created_at, paid_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&layaway.id)
    .bind(&layaway.number)
    .bind(&layaway.customer_id)
    .bind(&layaway.variant_id)
    .bind(&layaway.store_id)
    .bind(layaway.status)
    .bind(layaway.total_price_cents)
    .bind(layaway.amount_paid_cents)
    .bind(layaway.balance_cents)
    .bind(&layaway.created_by)
    .bind(layaway.created_at)
    .bind(layaway.paid_at)
    .execute(&mut *conn)
    .await?;

    debug!(layaway_id = %layaway.id, number = %layaway.number, "Layaway row written");
    Ok(())
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &LayawayPayment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO layaway_payments (id, layaway_id, amount_cents, method, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.layaway_id)
    .bind(payment.amount_cents)
    .bind(payment.method)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(payment_id = %payment.id, amount = %payment.amount(), "Layaway payment row written");
    Ok(())
}

async fn update_status(conn: &mut SqliteConnection, layaway: &Layaway, previous: LayawayStatus) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE layaways
           SET status = ?2, cancel_reason = ?3, delivered_at = ?4, cancelled_at = ?5
         WHERE id = ?1 AND status = ?6
        "#,
    )
    .bind(&layaway.id)
    .bind(layaway.status)
    .bind(&layaway.cancel_reason)
    .bind(layaway.delivered_at)
    .bind(layaway.cancelled_at)
    .bind(previous)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict(format!("layaway {} changed concurrently", layaway.id)));
    }
    Ok(())
}
