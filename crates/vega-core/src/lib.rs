//! # vega-core: Pure Business Logic for Vega POS
//!
//! This crate holds every rule of the sale-commit and cash-reconciliation
//! engine that can be expressed without touching storage: money math, the
//! promotion resolver, the pricing calculator, the cart, the cash-session
//! state machine and the layaway ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vega POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Register UI (external collaborator)             │   │
//! │  │    Cart UI ──► Tender UI ──► Drawer close ──► Layaway desk      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vega-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ promotion │  │  pricing  │  │   cart    │  │  session  │  │   │
//! │  │   │ resolver  │─►│   Totals  │◄─│ recompute │  │  layaway  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          vega-db (SQLite, atomic commit, services)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer-cent `Money`
//! - [`types`] - Sale, payment, inventory and customer records
//! - [`promotion`] - Promotion model and the resolver
//! - [`pricing`] - Subtotal / discount / tax / total
//! - [`cart`] - Cart lines and `recompute`
//! - [`session`] - Cash session state machine
//! - [`tender`] - Payment checks against the sale total
//! - [`layaway`] - Layaway ledger state machine
//! - [`numbering`] - Sale and layaway number formats
//! - [`clock`] - Injected time source
//! - [`error`] / [`validation`] - Error taxonomy and input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use vega_core::cart::{Cart, CartLine};
//! use vega_core::pricing::TaxPolicy;
//! use vega_core::types::TaxRate;
//!
//! let mut cart = Cart::new();
//! cart.add_line(CartLine::new("prod-1", "var-1", "TEE-M", "T-Shirt M", 10_000, 2))
//!     .unwrap();
//!
//! let policy = TaxPolicy::new(TaxRate::from_bps(1600), true);
//! let quote = cart.recompute(&[], policy, chrono::Utc::now());
//!
//! assert_eq!(quote.totals.subtotal.cents(), 20_000);
//! assert_eq!(quote.totals.tax.cents(), 3_200);
//! assert_eq!(quote.totals.total.cents(), 23_200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod clock;
pub mod error;
pub mod layaway;
pub mod money;
pub mod numbering;
pub mod pricing;
pub mod promotion;
pub mod session;
pub mod tender;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in a cart.
///
/// Guards against typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price accepted on a cart line (10,000,000.00).
///
/// With [`MAX_CART_ITEMS`] lines of [`MAX_ITEM_QUANTITY`] each, subtotal plus
/// a 100% tax still fits in `i64` cents.
pub const MAX_UNIT_PRICE_CENTS: i64 = 1_000_000_000;
