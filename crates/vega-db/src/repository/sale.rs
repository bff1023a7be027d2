//! # Sale Repository
//!
//! Durable side of the sale commit: one transaction writes the sale, its
//! items, the payment, the stock decrements with their movements and the
//! store-credit debit.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    1. next_value("sale:{TT}:{YYYYMMDD}")   → number (takes write lock)  │
//! │    2. session exists and is open           (if supplied)                │
//! │    3. registered customer exists           (if any)                     │
//! │    4. INSERT sales (status = completed)                                 │
//! │    5. per line:                                                         │
//! │         INSERT sale_items                                               │
//! │         UPDATE inventory ... WHERE quantity >= qty  → InsufficientStock │
//! │         INSERT inventory_movements                                      │
//! │    6. INSERT payments                                                   │
//! │    7. UPDATE customers ... WHERE credit >= total   (store credit only)  │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error: the transaction is dropped and rolled back. Nothing from    │
//! │  the attempt, including the sequence number, is visible afterwards.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{customer, inventory, sequence};
use vega_core::cart::CartLine;
use vega_core::numbering::{format_sale_number, sale_sequence_key};
use vega_core::pricing::Totals;
use vega_core::session::SessionStatus;
use vega_core::tender::{Settlement, Tender};
use vega_core::{
    CoreError, InventoryMovement, Money, Payment, PaymentMethod, PaymentStatus, Sale, SaleCustomer, SaleItem,
    SaleStatus, ValidationError,
};

/// Everything needed to write one sale. Built by the checkout service after
/// pricing and tender validation.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub store_id: String,
    pub terminal_code: String,
    pub cashier_id: String,
    pub session_id: Option<String>,
    pub customer: SaleCustomer,
    pub lines: Vec<CartLine>,
    pub totals: Totals,
    pub tender: Tender,
    pub settlement: Settlement,
    pub now: DateTime<Utc>,
}

/// The rows written by a successful commit.
#[derive(Debug, Clone)]
pub struct CommittedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payment: Payment,
    pub movements: Vec<InventoryMovement>,
}

const SELECT_SALE: &str = r#"
    SELECT id, number, customer_id, quick_customer, store_id, cashier_id, session_id,
           promotion_id, subtotal_cents, discount_cents, tax_cents, total_cents,
           status, created_at, completed_at
    FROM sales
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Writes a completed sale atomically.
    pub async fn commit(&self, draft: &SaleDraft) -> DbResult<CommittedSale> {
        let mut tx = self.pool.begin().await?;

        // A write first, so the transaction holds the lock before reading
        // session state.
        let day = draft.now.date_naive();
        let seq = sequence::next_value(&mut tx, &sale_sequence_key(day, &draft.terminal_code)).await?;
        let number = format_sale_number(day, &draft.terminal_code, seq);

        if let Some(session_id) = &draft.session_id {
            require_open_session(&mut tx, session_id).await?;
        }
        if let Some(customer_id) = draft.customer.customer_id() {
            customer::require_exists(&mut tx, customer_id).await?;
        }

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            number,
            customer_id: draft.customer.customer_id().map(str::to_string),
            quick_customer: draft.customer.quick_name().map(|name| name.trim().to_string()),
            store_id: draft.store_id.clone(),
            cashier_id: draft.cashier_id.clone(),
            session_id: draft.session_id.clone(),
            promotion_id: draft.totals.promotion_id.clone(),
            subtotal_cents: draft.totals.subtotal.cents(),
            discount_cents: draft.totals.discount.cents(),
            tax_cents: draft.totals.tax.cents(),
            total_cents: draft.totals.total.cents(),
            status: SaleStatus::Completed,
            created_at: draft.now,
            completed_at: Some(draft.now),
        };
        insert_sale(&mut tx, &sale).await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        let mut movements = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                sku_snapshot: line.sku.clone(),
                name_snapshot: line.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                subtotal_cents: line.line_subtotal().cents(),
                created_at: draft.now,
            };
            insert_item(&mut tx, &item).await?;

            let movement = inventory::decrement_for_sale(
                &mut tx,
                &line.variant_id,
                &draft.store_id,
                line.quantity,
                &sale.id,
                &draft.cashier_id,
                draft.now,
            )
            .await?;

            items.push(item);
            movements.push(movement);
        }

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            method: draft.tender.method,
            amount_cents: draft.settlement.amount.cents(),
            tendered_cents: draft.settlement.tendered.map(|m| m.cents()),
            change_cents: draft.settlement.change.map(|m| m.cents()),
            reference: draft.tender.reference.clone(),
            status: PaymentStatus::Completed,
            created_at: draft.now,
        };
        insert_payment(&mut tx, &payment).await?;

        if payment.method == PaymentMethod::StoreCredit {
            let customer_id = draft
                .customer
                .customer_id()
                .ok_or_else(|| CoreError::from(ValidationError::required("customer")))?;
            customer::debit_store_credit(&mut tx, customer_id, payment.amount(), draft.now).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            number = %sale.number,
            total = %sale.total(),
            method = ?payment.method,
            lines = items.len(),
            "Sale committed"
        );

        Ok(CommittedSale {
            sale,
            items,
            payment,
            movements,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE number = ?1"))
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, variant_id, sku_snapshot, name_snapshot,
                   quantity, unit_price_cents, subtotal_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn payments(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, sale_id, method, amount_cents, tendered_cents, change_cents,
                   reference, status, created_at
            FROM payments
            WHERE sale_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Sum of completed payments for a sale.
    pub async fn total_paid(&self, sale_id: &str) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM payments
            WHERE sale_id = ?1 AND status = 'completed'
            "#,
        )
        .bind(sale_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(cents))
    }

    pub async fn list_by_session(&self, session_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} WHERE session_id = ?1 ORDER BY created_at, number"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

async fn require_open_session(conn: &mut SqliteConnection, session_id: &str) -> DbResult<()> {
    let status: Option<SessionStatus> =
        sqlx::query_scalar("SELECT status FROM cash_sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&mut *conn)
            .await?;

    match status {
        Some(SessionStatus::Open) => Ok(()),
        Some(status) => Err(CoreError::InvalidSessionStatus {
            session_id: session_id.to_string(),
            status: status.to_string(),
        }
        .into()),
        None => Err(DbError::not_found("CashSession", session_id)),
    }
}

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, number, customer_id, quick_customer, store_id, cashier_id, session_id,
            promotion_id, subtotal_cents, discount_cents, tax_cents, total_cents,
            status, created_at, completed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.number)
    .bind(&sale.customer_id)
    .bind(&sale.quick_customer)
    .bind(&sale.store_id)
    .bind(&sale.cashier_id)
    .bind(&sale.session_id)
    .bind(&sale.promotion_id)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.status)
    .bind(sale.created_at)
    .bind(sale.completed_at)
    .execute(&mut *conn)
    .await?;

    debug!(sale_id = %sale.id, number = %sale.number, "Sale row written");
    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, variant_id, sku_snapshot, name_snapshot,
            quantity, unit_price_cents, subtotal_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.variant_id)
    .bind(&item.sku_snapshot)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.subtotal_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, sale_id, method, amount_cents, tendered_cents, change_cents,
            reference, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.method)
    .bind(payment.amount_cents)
    .bind(payment.tendered_cents)
    .bind(payment.change_cents)
    .bind(&payment.reference)
    .bind(payment.status)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(payment_id = %payment.id, amount = %payment.amount(), "Payment row written");
    Ok(())
}
