//! # Inventory Repository
//!
//! Stock levels and the movement ledger.
//!
//! ## The Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE inventory                                                       │
//! │     SET quantity = quantity - :qty                                      │
//! │   WHERE variant_id = :v AND store_id = :s                               │
//! │     AND quantity >= :qty          ← check and write in ONE statement    │
//! │  RETURNING quantity               ← quantity_after for the movement     │
//! │                                                                         │
//! │  no row back → read available → CoreError::InsufficientStock            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every change to `inventory.quantity` writes an [`InventoryMovement`] in
//! the same transaction. Movements are never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vega_core::validation::{validate_reason, validate_required};
use vega_core::{
    CoreError, InventoryMovement, InventoryRecord, MovementType, ReferenceType, ValidationError,
};

const MOVEMENT_COLUMNS: &str = r#"
    id, variant_id, store_id, movement_type,
    quantity_delta, quantity_before, quantity_after,
    reference_type, reference_id, reason, created_by, created_at
"#;

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets the stock record for a variant in a store.
    pub async fn get(&self, variant_id: &str, store_id: &str) -> DbResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT variant_id, store_id, quantity, min_stock, updated_at
            FROM inventory
            WHERE variant_id = ?1 AND store_id = ?2
            "#,
        )
        .bind(variant_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Brings stock to an absolute count (physical count, initial load).
    ///
    /// Creates the record if missing. Writes an adjustment movement for the
    /// difference; no movement when the count already matches.
    pub async fn set_stock(
        &self,
        variant_id: &str,
        store_id: &str,
        quantity: i64,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryRecord> {
        validate_required("variant_id", variant_id)?;
        validate_required("store_id", store_id)?;
        if quantity < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "quantity".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let before: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO inventory (variant_id, store_id, quantity, min_stock, updated_at)
            VALUES (?1, ?2, 0, 0, ?3)
            ON CONFLICT (variant_id, store_id) DO UPDATE SET updated_at = excluded.updated_at
            RETURNING quantity
            "#,
        )
        .bind(variant_id)
        .bind(store_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let delta = quantity - before;
        if delta != 0 {
            sqlx::query(
                "UPDATE inventory SET quantity = ?3 WHERE variant_id = ?1 AND store_id = ?2",
            )
            .bind(variant_id)
            .bind(store_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            let movement = InventoryMovement {
                id: Uuid::new_v4().to_string(),
                variant_id: variant_id.to_string(),
                store_id: store_id.to_string(),
                movement_type: MovementType::for_adjustment(delta),
                quantity_delta: delta,
                quantity_before: before,
                quantity_after: quantity,
                reference_type: ReferenceType::Adjustment,
                reference_id: format!("count:{}", variant_id),
                reason: Some("stock count".to_string()),
                created_by: created_by.to_string(),
                created_at: now,
            };
            insert_movement(&mut tx, &movement).await?;
        }

        let record = fetch_record(&mut tx, variant_id, store_id).await?;
        tx.commit().await?;

        info!(variant_id = %variant_id, store_id = %store_id, before, after = quantity, "Stock set");
        Ok(record)
    }

    /// Sets the reorder threshold.
    pub async fn set_min_stock(&self, variant_id: &str, store_id: &str, min_stock: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE inventory SET min_stock = ?3 WHERE variant_id = ?1 AND store_id = ?2",
        )
        .bind(variant_id)
        .bind(store_id)
        .bind(min_stock)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory", variant_id));
        }
        Ok(())
    }

    /// Signed manual adjustment. Never takes stock below zero.
    pub async fn adjust(
        &self,
        variant_id: &str,
        store_id: &str,
        delta: i64,
        reason: &str,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryMovement> {
        validate_reason(reason)?;
        if delta == 0 {
            return Err(ValidationError::MustBePositive {
                field: "adjustment".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE inventory
               SET quantity = quantity + ?3, updated_at = ?4
             WHERE variant_id = ?1 AND store_id = ?2 AND quantity + ?3 >= 0
            RETURNING quantity
            "#,
        )
        .bind(variant_id)
        .bind(store_id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let after = match after {
            Some(after) => after,
            None => {
                let available = available_quantity(&mut tx, variant_id, store_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Inventory", variant_id))?;
                return Err(CoreError::InsufficientStock {
                    variant_id: variant_id.to_string(),
                    available,
                    requested: -delta,
                }
                .into());
            }
        };

        let movement = InventoryMovement {
            id: Uuid::new_v4().to_string(),
            variant_id: variant_id.to_string(),
            store_id: store_id.to_string(),
            movement_type: MovementType::for_adjustment(delta),
            quantity_delta: delta,
            quantity_before: after - delta,
            quantity_after: after,
            reference_type: ReferenceType::Adjustment,
            reference_id: Uuid::new_v4().to_string(),
            reason: Some(reason.trim().to_string()),
            created_by: created_by.to_string(),
            created_at: now,
        };
        insert_movement(&mut tx, &movement).await?;
        tx.commit().await?;

        info!(variant_id = %variant_id, delta, after, "Inventory adjusted");
        Ok(movement)
    }

    /// Audit trail for a variant, oldest first.
    pub async fn movements(&self, variant_id: &str, store_id: &str) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements \
             WHERE variant_id = ?1 AND store_id = ?2 ORDER BY created_at, rowid"
        );
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(variant_id)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements written for one sale, return or adjustment.
    pub async fn movements_for_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements \
             WHERE reference_type = ?1 AND reference_id = ?2 ORDER BY rowid"
        );
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(reference_type)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Records at or below their reorder threshold.
    pub async fn low_stock(&self, store_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT variant_id, store_id, quantity, min_stock, updated_at
            FROM inventory
            WHERE store_id = ?1 AND quantity <= min_stock
            ORDER BY quantity, variant_id
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

/// Takes `quantity` units for a sale and writes the matching movement.
pub(crate) async fn decrement_for_sale(
    conn: &mut SqliteConnection,
    variant_id: &str,
    store_id: &str,
    quantity: i64,
    sale_id: &str,
    created_by: &str,
    now: DateTime<Utc>,
) -> DbResult<InventoryMovement> {
    let after: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE inventory
           SET quantity = quantity - ?3, updated_at = ?4
         WHERE variant_id = ?1 AND store_id = ?2 AND quantity >= ?3
        RETURNING quantity
        "#,
    )
    .bind(variant_id)
    .bind(store_id)
    .bind(quantity)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(after) = after else {
        let available = available_quantity(conn, variant_id, store_id).await?.unwrap_or(0);
        return Err(CoreError::InsufficientStock {
            variant_id: variant_id.to_string(),
            available,
            requested: quantity,
        }
        .into());
    };

    let movement = InventoryMovement {
        id: Uuid::new_v4().to_string(),
        variant_id: variant_id.to_string(),
        store_id: store_id.to_string(),
        movement_type: MovementType::Sale,
        quantity_delta: -quantity,
        quantity_before: after + quantity,
        quantity_after: after,
        reference_type: ReferenceType::Sale,
        reference_id: sale_id.to_string(),
        reason: None,
        created_by: created_by.to_string(),
        created_at: now,
    };
    insert_movement(conn, &movement).await?;

    debug!(
        variant_id = %variant_id,
        before = movement.quantity_before,
        after,
        "Stock decremented for sale"
    );
    Ok(movement)
}

pub(crate) async fn insert_movement(conn: &mut SqliteConnection, movement: &InventoryMovement) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, variant_id, store_id, movement_type,
            quantity_delta, quantity_before, quantity_after,
            reference_type, reference_id, reason, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.variant_id)
    .bind(&movement.store_id)
    .bind(movement.movement_type)
    .bind(movement.quantity_delta)
    .bind(movement.quantity_before)
    .bind(movement.quantity_after)
    .bind(movement.reference_type)
    .bind(&movement.reference_id)
    .bind(&movement.reason)
    .bind(&movement.created_by)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn available_quantity(
    conn: &mut SqliteConnection,
    variant_id: &str,
    store_id: &str,
) -> DbResult<Option<i64>> {
    let available: Option<i64> = sqlx::query_scalar(
        "SELECT quantity FROM inventory WHERE variant_id = ?1 AND store_id = ?2",
    )
    .bind(variant_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(available)
}

async fn fetch_record(conn: &mut SqliteConnection, variant_id: &str, store_id: &str) -> DbResult<InventoryRecord> {
    sqlx::query_as::<_, InventoryRecord>(
        r#"
        SELECT variant_id, store_id, quantity, min_stock, updated_at
        FROM inventory
        WHERE variant_id = ?1 AND store_id = ?2
        "#,
    )
    .bind(variant_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Inventory", variant_id))
}

// =============================================================================
// Unit Tests
// =============================================================================
