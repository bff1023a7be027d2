//! # Promotion Repository
//!
//! Stores promotion definitions. Scope is kept as a JSON column and decoded
//! into [`PromotionScope`] on read.
//!
//! `list_active` returns candidates in resolver order: priority descending,
//! then created_at and id ascending.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use vega_core::promotion::{Promotion, PromotionKind, PromotionScope};
use vega_core::validation::{validate_non_negative_cents, validate_quantity, validate_required};

/// Raw `promotions` row; `scope` still JSON.
#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: String,
    name: String,
    kind: PromotionKind,
    value: i64,
    min_quantity: i64,
    min_purchase_cents: i64,
    priority: i32,
    active: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    scope: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = DbError;

    fn try_from(row: PromotionRow) -> Result<Self, Self::Error> {
        let scope: PromotionScope =
            serde_json::from_str(&row.scope).map_err(|e| DbError::CorruptData {
                entity: format!("Promotion {}", row.id),
                reason: format!("invalid scope: {e}"),
            })?;

        Ok(Promotion {
            id: row.id,
            name: row.name,
            kind: row.kind,
            value: row.value,
            min_quantity: row.min_quantity,
            min_purchase_cents: row.min_purchase_cents,
            priority: row.priority,
            active: row.active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            scope,
            created_at: row.created_at,
        })
    }
}

const SELECT_PROMOTION: &str = r#"
    SELECT id, name, kind, value, min_quantity, min_purchase_cents, priority,
           active, starts_at, ends_at, scope, created_at
    FROM promotions
"#;

/// Repository for promotion database operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        validate_required("name", &promotion.name)?;
        validate_non_negative_cents("value", promotion.value)?;
        validate_quantity(promotion.min_quantity)?;
        validate_non_negative_cents("min purchase", promotion.min_purchase_cents)?;
        if let (Some(starts), Some(ends)) = (promotion.starts_at, promotion.ends_at) {
            if ends < starts {
                return Err(DbError::CheckViolation {
                    message: format!("promotion {} ends before it starts", promotion.id),
                });
            }
        }

        let scope = serde_json::to_string(&promotion.scope)
            .map_err(|e| DbError::Internal(format!("failed to encode promotion scope: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, name, kind, value, min_quantity, min_purchase_cents, priority,
                active, starts_at, ends_at, scope, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.name)
        .bind(promotion.kind)
        .bind(promotion.value)
        .bind(promotion.min_quantity)
        .bind(promotion.min_purchase_cents)
        .bind(promotion.priority)
        .bind(promotion.active)
        .bind(promotion.starts_at)
        .bind(promotion.ends_at)
        .bind(scope)
        .bind(promotion.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %promotion.id, kind = ?promotion.kind, priority = promotion.priority, "Promotion created");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let row = sqlx::query_as::<_, PromotionRow>(&format!("{SELECT_PROMOTION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Promotion::try_from).transpose()
    }

    /// Active promotions whose window contains `now`, in resolver order.
    pub async fn list_active(&self, now: DateTime<Utc>) -> DbResult<Vec<Promotion>> {
        let rows = sqlx::query_as::<_, PromotionRow>(&format!(
            "{SELECT_PROMOTION} WHERE active = 1 ORDER BY priority DESC, created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let promotions = rows
            .into_iter()
            .map(Promotion::try_from)
            .collect::<DbResult<Vec<_>>>()?
            .into_iter()
            .filter(|promo| promo.in_window(now))
            .collect::<Vec<_>>();

        debug!(count = promotions.len(), "Loaded active promotions");
        Ok(promotions)
    }

    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE promotions SET active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }

        info!(id = %id, "Promotion deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;

    fn promo(id: &str, priority: i32, created_at: DateTime<Utc>) -> Promotion {
        Promotion::new(id, format!("Promo {id}"), PromotionKind::Percentage, 1_000, priority, created_at)
    }

    #[tokio::test]
    async fn test_insert_round_trips_scope() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut p = promo("p1", 5, Utc::now());
        p.scope = PromotionScope::VariantSet(vec!["var-1".into(), "var-2".into()]);
        db.promotions().insert(&p).await.unwrap();

        let fetched = db.promotions().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(fetched.scope, p.scope);
        assert_eq!(fetched.kind, PromotionKind::Percentage);
        assert!(fetched.active);
    }

    #[tokio::test]
    async fn test_list_active_orders_and_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        db.promotions().insert(&promo("low", 1, now)).await.unwrap();
        db.promotions().insert(&promo("high-b", 9, now)).await.unwrap();
        db.promotions()
            .insert(&promo("high-a", 9, now - Duration::hours(1)))
            .await
            .unwrap();

        let mut expired = promo("expired", 50, now);
        expired.ends_at = Some(now - Duration::minutes(1));
        db.promotions().insert(&expired).await.unwrap();

        let mut inactive = promo("inactive", 50, now);
        inactive.active = false;
        db.promotions().insert(&inactive).await.unwrap();

        let ids: Vec<String> = db
            .promotions()
            .list_active(now)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["high-a", "high-b", "low"]);
    }

    #[tokio::test]
    async fn test_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.promotions().insert(&promo("p1", 1, Utc::now())).await.unwrap();
        db.promotions().deactivate("p1").await.unwrap();

        assert!(db.promotions().list_active(Utc::now()).await.unwrap().is_empty());
        assert!(matches!(
            db.promotions().deactivate("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reversed_window_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let mut p = promo("p1", 1, now);
        p.starts_at = Some(now);
        p.ends_at = Some(now - Duration::days(1));
        assert!(db.promotions().insert(&p).await.is_err());
    }
}
