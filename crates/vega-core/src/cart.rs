//! # Cart
//!
//! The mutable side of a sale, before commit.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Register Action          Cart Method              Then                 │
//! │  ───────────────          ───────────              ────                 │
//! │  Scan item ─────────────► add_line() ────────────┐                      │
//! │  Change quantity ───────► update_quantity() ─────┤                      │
//! │  Remove item ───────────► remove_line() ─────────┼──► recompute()       │
//! │  Void cart ─────────────► clear() ───────────────┘    (promotion +      │
//! │                                                        totals)          │
//! │                                                                         │
//! │  recompute() is pure: same cart, promotions, policy and now →           │
//! │  same CartQuote.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{self, TaxPolicy, Totals};
use crate::promotion::{self, Promotion};
use crate::validation::{validate_price_cents, validate_quantity, validate_required};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// - `sku` and `name` are frozen when the line is added, so the register
///   shows consistent data even if the catalog changes mid-sale.
/// - `unit_price_cents` is frozen too; the commit uses it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub variant_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(
        product_id: impl Into<String>,
        variant_id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price_cents: i64,
        quantity: i64,
    ) -> Self {
        CartLine {
            product_id: product_id.into(),
            variant_id: variant_id.into(),
            sku: sku.into(),
            name: name.into(),
            unit_price_cents,
            quantity,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// unit_price × quantity.
    #[inline]
    pub fn line_subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Checks the line on its own (ids present, price and quantity in range).
    pub fn validate(&self) -> CoreResult<()> {
        validate_required("product_id", &self.product_id)?;
        validate_required("variant_id", &self.variant_id)?;
        validate_price_cents(self.unit_price_cents)?;
        if self.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: self.quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        validate_quantity(self.quantity)?;
        Ok(())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `variant_id` (adding the same variant increases quantity)
/// - Every quantity is in 1..=MAX_ITEM_QUANTITY
/// - At most MAX_CART_ITEMS lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
}

/// Result of [`Cart::recompute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartQuote {
    pub promotion: Option<Promotion>,
    pub totals: Totals,
}

impl Cart {
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Builds a cart from lines, merging repeated variants.
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> CoreResult<Self> {
        let mut cart = Cart::new();
        for line in lines {
            cart.add_line(line)?;
        }
        Ok(cart)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, variant_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.variant_id == variant_id)
    }

    /// Adds a line, or increases quantity if the variant is already present.
    pub fn add_line(&mut self, line: CartLine) -> CoreResult<()> {
        line.validate()?;

        if let Some(existing) = self.lines.iter_mut().find(|l| l.variant_id == line.variant_id) {
            let new_qty = existing.quantity + line.quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            existing.quantity = new_qty;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.lines.push(line);
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, variant_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(variant_id);
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        validate_quantity(quantity)?;

        match self.lines.iter_mut().find(|l| l.variant_id == variant_id) {
            Some(line) => {
                line.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::LineNotFound(variant_id.to_string())),
        }
    }

    pub fn remove_line(&mut self, variant_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.variant_id != variant_id);

        if self.lines.len() == before {
            Err(CoreError::LineNotFound(variant_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_subtotal).sum()
    }

    /// Resolves the promotion and prices the cart in one pure step.
    pub fn recompute(
        &self,
        promotions: &[Promotion],
        policy: TaxPolicy,
        now: DateTime<Utc>,
    ) -> CartQuote {
        let promotion = promotion::resolve_for_cart(promotions, &self.lines, now);
        let totals = pricing::price(&self.lines, promotion, policy);
        CartQuote {
            promotion: promotion.cloned(),
            totals,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
