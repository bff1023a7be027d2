//! # Pricing Calculator
//!
//! ```text
//! subtotal = Σ line subtotal
//! discount = percentage   → subtotal × value bps
//!            fixed_amount → value cents
//!            otherwise    → 0
//! tax      = enabled ? subtotal × rate : 0      (pre-discount subtotal)
//! total    = max(0, subtotal + tax − discount)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::money::Money;
use crate::promotion::{Promotion, PromotionKind};
use crate::types::TaxRate;

/// Store-level tax configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxPolicy {
    pub rate: TaxRate,
    pub enabled: bool,
}

impl TaxPolicy {
    pub const fn new(rate: TaxRate, enabled: bool) -> Self {
        TaxPolicy { rate, enabled }
    }

    pub const fn disabled() -> Self {
        TaxPolicy {
            rate: TaxRate::zero(),
            enabled: false,
        }
    }

    pub fn tax_on(&self, amount: Money) -> Money {
        if self.enabled {
            amount.calculate_tax(self.rate)
        } else {
            Money::zero()
        }
    }
}

/// Computed figures for a cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    /// The promotion the discount came from.
    pub promotion_id: Option<String>,
}

/// Discount a promotion grants on `subtotal`.
pub fn discount_for(promotion: &Promotion, subtotal: Money) -> Money {
    match promotion.kind {
        PromotionKind::Percentage => {
            let bps = u32::try_from(promotion.value.max(0)).unwrap_or(u32::MAX);
            subtotal.percentage(bps)
        }
        PromotionKind::FixedAmount => Money::from_cents(promotion.value.max(0)),
        // Declared kinds without a computation yet.
        PromotionKind::BuyXGetY | PromotionKind::SecondItemDiscount => Money::zero(),
    }
}

/// Prices `lines` with at most one promotion.
///
/// ```rust
/// use vega_core::cart::CartLine;
/// use vega_core::pricing::{price, TaxPolicy};
/// use vega_core::types::TaxRate;
///
/// let lines = vec![CartLine::new("p", "v", "SKU", "Item", 10_000, 2)];
/// let totals = price(&lines, None, TaxPolicy::new(TaxRate::from_bps(1600), true));
/// assert_eq!(totals.total.cents(), 23_200);
/// ```
pub fn price(lines: &[CartLine], promotion: Option<&Promotion>, policy: TaxPolicy) -> Totals {
    let subtotal: Money = lines.iter().map(CartLine::line_subtotal).sum();
    let discount = promotion.map_or(Money::zero(), |promo| discount_for(promo, subtotal));
    let tax = policy.tax_on(subtotal);
    let total = (subtotal + tax - discount).floor_zero();

    Totals {
        subtotal,
        discount,
        tax,
        total,
        promotion_id: promotion.map(|promo| promo.id.clone()),
    }
}
