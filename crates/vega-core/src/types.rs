//! # Domain Types
//!
//! Records produced by the sale-commit engine and the inventory ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Commit Output                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │──►│    SaleItem     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  sale_id (FK)   │   │  sale_id (FK)   │       │
//! │  │  number         │   │  variant_id     │   │  method         │       │
//! │  │  session_id     │   │  quantity       │   │  amount_cents   │       │
//! │  │  total_cents    │   │  subtotal_cents │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌───────────────┐     │
//! │  │ InventoryRecord │──►│ InventoryMovement   │   │   Customer    │     │
//! │  │  variant+store  │   │  before/delta/after │   │ store_credit  │     │
//! │  └─────────────────┘   └─────────────────────┘   └───────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for relations
//! - Business ID: (`number` for sales and layaways) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points: 1 bps = 0.01%, so 1600 bps = 16%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (config convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// The rate as a percentage, for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// The commit engine only ever writes `Completed`. `Voided` and `Returned`
/// belong to the reversal flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Draft,
    Completed,
    Voided,
    Returned,
}

// =============================================================================
// Payment Method / Status
// =============================================================================

/// How a sale or layaway installment was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash into the drawer. The only method counted at drawer close.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Bank transfer.
    Transfer,
    /// Debit against the customer's store credit.
    StoreCredit,
}

impl PaymentMethod {
    /// Returns true if this payment puts money in the cash drawer.
    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale.
///
/// ## Invariant
/// `total_cents == max(0, subtotal_cents + tax_cents - discount_cents)`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Externally unique number, `YYYYMMDD-TT-NNNN`.
    pub number: String,
    /// Registered customer, if any.
    pub customer_id: Option<String>,
    /// Free-text walk-in customer name, if any.
    pub quick_customer: Option<String>,
    pub store_id: String,
    pub cashier_id: String,
    /// Cash session the sale was rung up under.
    pub session_id: Option<String>,
    /// Promotion applied by the resolver.
    pub promotion_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub status: SaleStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks the total invariant against the stored components.
    pub fn totals_consistent(&self) -> bool {
        let expected = (Money::from_cents(self.subtotal_cents) + Money::from_cents(self.tax_cents)
            - Money::from_cents(self.discount_cents))
        .floor_zero();
        expected.cents() == self.total_cents
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a committed sale. Product data is snapshotted at commit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub variant_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a sale.
///
/// Commits are single-tender: one payment whose amount equals the sale total.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// For cash: amount the customer handed over.
    pub tendered_cents: Option<i64>,
    /// For cash: change returned to the customer.
    pub change_cents: Option<i64>,
    /// External reference (card auth code, transfer id).
    pub reference: Option<String>,
    pub status: PaymentStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock on hand for one variant in one store.
///
/// Only ever changed together with an [`InventoryMovement`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryRecord {
    pub variant_id: String,
    pub store_id: String,
    pub quantity: i64,
    /// Reorder threshold.
    pub min_stock: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    #[inline]
    pub fn is_low(&self) -> bool {
        self.quantity <= self.min_stock
    }
}

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Sale,
    Return,
    AdjustmentIn,
    AdjustmentOut,
}

impl MovementType {
    /// Movement type for a signed manual adjustment.
    pub fn for_adjustment(delta: i64) -> Self {
        if delta >= 0 {
            MovementType::AdjustmentIn
        } else {
            MovementType::AdjustmentOut
        }
    }
}

/// What caused a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Sale,
    Return,
    Adjustment,
}

/// Append-only audit entry for one stock change.
///
/// ## Invariant
/// `quantity_after == quantity_before + quantity_delta`, and `quantity_after`
/// equals the [`InventoryRecord`] quantity written in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub variant_id: String,
    pub store_id: String,
    pub movement_type: MovementType,
    /// Signed: negative for sales and adjustments out.
    pub quantity_delta: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    pub reason: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.quantity_after == self.quantity_before + self.quantity_delta
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Never negative.
    pub store_credit_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn store_credit(&self) -> Money {
        Money::from_cents(self.store_credit_cents)
    }
}

/// Who a sale is rung up for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SaleCustomer {
    /// Anonymous walk-in.
    #[default]
    Anonymous,
    /// Registered customer by id.
    Registered(String),
    /// Quick customer: a name typed at the register, no record.
    Quick(String),
}

impl SaleCustomer {
    /// The customer id, for registered customers only.
    pub fn customer_id(&self) -> Option<&str> {
        match self {
            SaleCustomer::Registered(id) => Some(id),
            _ => None,
        }
    }

    pub fn quick_name(&self) -> Option<&str> {
        match self {
            SaleCustomer::Quick(name) => Some(name),
            _ => None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(subtotal: i64, tax: i64, discount: i64, total: i64) -> Sale {
        Sale {
            id: "s1".to_string(),
            number: "20261017-01-0001".to_string(),
            customer_id: None,
            quick_customer: None,
            store_id: "store".to_string(),
            cashier_id: "cashier".to_string(),
            session_id: None,
            promotion_id: None,
            subtotal_cents: subtotal,
            discount_cents: discount,
            tax_cents: tax,
            total_cents: total,
            status: SaleStatus::Completed,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(16.0);
        assert_eq!(rate.bps(), 1600);
        assert!((rate.percentage() - 16.0).abs() < 0.001);
    }

    #[test]
    fn test_sale_totals_invariant() {
        assert!(sale(20_000, 3_200, 2_000, 21_200).totals_consistent());
        assert!(sale(1_000, 0, 5_000, 0).totals_consistent());
        assert!(!sale(20_000, 3_200, 0, 20_000).totals_consistent());
    }

    #[test]
    fn test_movement_consistency() {
        let movement = InventoryMovement {
            id: "m1".to_string(),
            variant_id: "v1".to_string(),
            store_id: "store".to_string(),
            movement_type: MovementType::Sale,
            quantity_delta: -2,
            quantity_before: 5,
            quantity_after: 3,
            reference_type: ReferenceType::Sale,
            reference_id: "s1".to_string(),
            reason: None,
            created_by: "cashier".to_string(),
            created_at: Utc::now(),
        };
        assert!(movement.is_consistent());
    }

    #[test]
    fn test_adjustment_movement_type() {
        assert_eq!(MovementType::for_adjustment(3), MovementType::AdjustmentIn);
        assert_eq!(MovementType::for_adjustment(-3), MovementType::AdjustmentOut);
    }

    #[test]
    fn test_sale_customer_accessors() {
        let registered = SaleCustomer::Registered("c1".to_string());
        assert_eq!(registered.customer_id(), Some("c1"));
        assert_eq!(registered.quick_name(), None);

        let quick = SaleCustomer::Quick("Ana".to_string());
        assert_eq!(quick.customer_id(), None);
        assert_eq!(quick.quick_name(), Some("Ana"));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::StoreCredit).unwrap(),
            "\"store_credit\""
        );
        assert_eq!(
            serde_json::to_string(&MovementType::AdjustmentOut).unwrap(),
            "\"adjustment_out\""
        );
    }
}
