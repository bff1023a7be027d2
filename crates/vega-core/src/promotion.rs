//! # Promotion Resolver
//!
//! Picks the single promotion that applies to a sale.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  candidates (listed priority desc, created_at asc, id asc)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  is_eligible(ctx)                                                       │
//! │  ├── active == true                                                     │
//! │  ├── starts_at <= now <= ends_at   (missing bound = unbounded)          │
//! │  ├── quantity >= min_quantity                                           │
//! │  ├── cart_subtotal >= min_purchase                                      │
//! │  └── scope contains product or variant                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  max by priority, first candidate wins ties                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Option<&Promotion>  (None when nothing survives)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Promotions never stack: at most one is applied per sale. The resolver is
//! pure and is re-run on every cart mutation because its thresholds depend
//! on the cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::money::Money;

// =============================================================================
// Promotion Model
// =============================================================================

/// How a promotion's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromotionKind {
    /// `value` is basis points off the subtotal (1000 = 10%).
    Percentage,
    /// `value` is cents off the subtotal.
    FixedAmount,
    /// Declared; priced as zero discount.
    BuyXGetY,
    /// Declared; priced as zero discount.
    SecondItemDiscount,
}

/// Which products a promotion covers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "ids", rename_all = "snake_case")]
pub enum PromotionScope {
    #[default]
    AllProducts,
    ProductSet(Vec<String>),
    VariantSet(Vec<String>),
}

impl PromotionScope {
    pub fn contains(&self, product_id: &str, variant_id: &str) -> bool {
        match self {
            PromotionScope::AllProducts => true,
            PromotionScope::ProductSet(ids) => ids.iter().any(|id| id == product_id),
            PromotionScope::VariantSet(ids) => ids.iter().any(|id| id == variant_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub kind: PromotionKind,
    /// Basis points or cents depending on `kind`.
    pub value: i64,
    /// Defaults to 1.
    pub min_quantity: i64,
    /// Defaults to 0.
    pub min_purchase_cents: i64,
    /// Higher wins.
    pub priority: i32,
    pub active: bool,
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,
    pub scope: PromotionScope,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    /// A promotion with default thresholds, unbounded window and full scope.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: PromotionKind,
        value: i64,
        priority: i32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Promotion {
            id: id.into(),
            name: name.into(),
            kind,
            value,
            min_quantity: 1,
            min_purchase_cents: 0,
            priority,
            active: true,
            starts_at: None,
            ends_at: None,
            scope: PromotionScope::AllProducts,
            created_at,
        }
    }

    #[inline]
    pub fn min_purchase(&self) -> Money {
        Money::from_cents(self.min_purchase_cents)
    }

    /// True if `now` falls within `[starts_at, ends_at]`.
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.starts_at.map_or(true, |start| start <= now);
        let not_ended = self.ends_at.map_or(true, |end| now <= end);
        started && not_ended
    }

    /// Evaluates every eligibility rule against one line's context.
    pub fn is_eligible(&self, ctx: &PromotionContext<'_>) -> bool {
        self.active
            && self.in_window(ctx.now)
            && ctx.quantity >= self.min_quantity
            && ctx.cart_subtotal >= self.min_purchase()
            && self.scope.contains(ctx.product_id, ctx.variant_id)
    }
}

/// What the resolver sees for one cart line.
#[derive(Debug, Clone, Copy)]
pub struct PromotionContext<'a> {
    pub product_id: &'a str,
    pub variant_id: &'a str,
    pub quantity: i64,
    /// Whole-cart subtotal, not the line's.
    pub cart_subtotal: Money,
    pub now: DateTime<Utc>,
}

// =============================================================================
// Resolver
// =============================================================================

/// Returns the highest-priority eligible promotion, or `None`.
///
/// Ties keep the earliest candidate in iteration order.
///
/// ```rust
/// use chrono::Utc;
/// use vega_core::money::Money;
/// use vega_core::promotion::{resolve, Promotion, PromotionContext, PromotionKind};
///
/// let now = Utc::now();
/// let promos = vec![
///     Promotion::new("p1", "5% off", PromotionKind::Percentage, 500, 1, now),
///     Promotion::new("p2", "10% off", PromotionKind::Percentage, 1000, 5, now),
/// ];
/// let ctx = PromotionContext {
///     product_id: "prod-1",
///     variant_id: "var-1",
///     quantity: 1,
///     cart_subtotal: Money::from_cents(1_000),
///     now,
/// };
/// assert_eq!(resolve(&promos, &ctx).map(|p| p.id.as_str()), Some("p2"));
/// ```
pub fn resolve<'p>(candidates: &'p [Promotion], ctx: &PromotionContext<'_>) -> Option<&'p Promotion> {
    pick_highest(candidates.iter().filter(|promo| promo.is_eligible(ctx)))
}

/// Resolves against a whole cart: a candidate qualifies if it is eligible for
/// at least one line, evaluated with that line's quantity and the cart
/// subtotal.
pub fn resolve_for_cart<'p>(
    candidates: &'p [Promotion],
    lines: &[CartLine],
    now: DateTime<Utc>,
) -> Option<&'p Promotion> {
    let cart_subtotal: Money = lines.iter().map(CartLine::line_subtotal).sum();

    pick_highest(candidates.iter().filter(|promo| {
        lines.iter().any(|line| {
            promo.is_eligible(&PromotionContext {
                product_id: &line.product_id,
                variant_id: &line.variant_id,
                quantity: line.quantity,
                cart_subtotal,
                now,
            })
        })
    }))
}

// Strict `>` keeps the first of equal priorities.
fn pick_highest<'p>(eligible: impl Iterator<Item = &'p Promotion>) -> Option<&'p Promotion> {
    eligible.fold(None, |best: Option<&Promotion>, promo| match best {
        Some(current) if promo.priority > current.priority => Some(promo),
        Some(current) => Some(current),
        None => Some(promo),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    fn ctx(quantity: i64, subtotal_cents: i64) -> PromotionContext<'static> {
        PromotionContext {
            product_id: "prod-1",
            variant_id: "var-1",
            quantity,
            cart_subtotal: Money::from_cents(subtotal_cents),
            now: now(),
        }
    }

    fn promo(id: &str, priority: i32) -> Promotion {
        Promotion::new(id, id, PromotionKind::Percentage, 1000, priority, now())
    }

    #[test]
    fn test_empty_candidates_resolve_to_none() {
        assert!(resolve(&[], &ctx(1, 1_000)).is_none());
    }

    #[test]
    fn test_highest_priority_wins() {
        let promos = vec![promo("low", 1), promo("high", 9), promo("mid", 5)];
        assert_eq!(resolve(&promos, &ctx(1, 1_000)).unwrap().id, "high");
    }

    #[test]
    fn test_ties_keep_iteration_order() {
        let promos = vec![promo("first", 3), promo("second", 3)];
        assert_eq!(resolve(&promos, &ctx(1, 1_000)).unwrap().id, "first");
    }

    #[test]
    fn test_inactive_and_out_of_window_are_skipped() {
        let mut inactive = promo("inactive", 10);
        inactive.active = false;

        let mut expired = promo("expired", 9);
        expired.ends_at = Some(now() - Duration::days(1));

        let mut upcoming = promo("upcoming", 8);
        upcoming.starts_at = Some(now() + Duration::hours(1));

        let promos = vec![inactive, expired, upcoming, promo("ok", 1)];
        assert_eq!(resolve(&promos, &ctx(1, 1_000)).unwrap().id, "ok");
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let mut p = promo("edge", 1);
        p.starts_at = Some(now());
        p.ends_at = Some(now());
        assert!(p.in_window(now()));
    }

    #[test]
    fn test_thresholds() {
        let mut p = promo("bulk", 1);
        p.min_quantity = 3;
        p.min_purchase_cents = 50_000;
        let promos = vec![p];

        assert!(resolve(&promos, &ctx(2, 60_000)).is_none());
        assert!(resolve(&promos, &ctx(3, 49_999)).is_none());
        assert!(resolve(&promos, &ctx(3, 50_000)).is_some());
    }

    #[test]
    fn test_scope_matching() {
        let mut by_product = promo("by-product", 1);
        by_product.scope = PromotionScope::ProductSet(vec!["prod-1".to_string()]);
        let mut by_variant = promo("by-variant", 2);
        by_variant.scope = PromotionScope::VariantSet(vec!["var-9".to_string()]);

        let promos = vec![by_product, by_variant];
        assert_eq!(resolve(&promos, &ctx(1, 1_000)).unwrap().id, "by-product");
    }

    #[test]
    fn test_resolve_for_cart_uses_any_line() {
        let lines = vec![
            CartLine::new("prod-1", "var-1", "A", "A", 1_000, 1),
            CartLine::new("prod-2", "var-2", "B", "B", 2_000, 4),
        ];
        let mut bulk = promo("bulk-b", 5);
        bulk.min_quantity = 3;
        bulk.scope = PromotionScope::VariantSet(vec!["var-2".to_string()]);
        let promos = vec![promo("base", 1), bulk];

        assert_eq!(resolve_for_cart(&promos, &lines, now()).unwrap().id, "bulk-b");
    }

    #[test]
    fn test_resolve_for_cart_uses_cart_subtotal() {
        // Each line alone is 10.00, the cart is 20.00.
        let lines = vec![
            CartLine::new("prod-1", "var-1", "A", "A", 1_000, 1),
            CartLine::new("prod-2", "var-2", "B", "B", 1_000, 1),
        ];
        let mut p = promo("min-20", 1);
        p.min_purchase_cents = 2_000;
        let promos = vec![p];
        assert!(resolve_for_cart(&promos, &lines, now()).is_some());
    }

    #[test]
    fn test_scope_serializes_as_tagged_union() {
        let scope = PromotionScope::VariantSet(vec!["v1".to_string()]);
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, r#"{"type":"variant_set","ids":["v1"]}"#);

        let all: PromotionScope = serde_json::from_str(r#"{"type":"all_products"}"#).unwrap();
        assert_eq!(all, PromotionScope::AllProducts);
    }
}
