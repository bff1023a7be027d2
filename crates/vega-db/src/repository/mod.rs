//! # Repository Module
//!
//! Database repository implementations for Vega POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service (SaleCommitEngine, CashRegister, LayawayLedger)                │
//! │       │                                                                 │
//! │       │  db.sales().commit(&draft)                                      │
//! │       ▼                                                                 │
//! │  Repository (holds a SqlitePool clone)                                  │
//! │  ├── pool-level reads and single-statement writes                       │
//! │  └── multi-entity writes inside one transaction                         │
//! │       │                                                                 │
//! │       │  pub(crate) helpers taking &mut SqliteConnection                │
//! │       │  (sequence::next_value, inventory::decrement_for_sale,          │
//! │       │   customer::debit_store_credit) compose inside that transaction │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customers and store credit
//! - [`inventory::InventoryRepository`] - Stock levels and the movement trail
//! - [`layaway::LayawayRepository`] - Layaways and installments
//! - [`promotion::PromotionRepository`] - Promotion definitions
//! - [`sale::SaleRepository`] - Atomic sale commit and sale reads
//! - [`session::SessionRepository`] - Cash sessions and drawer close
//! - [`sequence`] - Sale and layaway number counters

pub mod customer;
pub mod inventory;
pub mod layaway;
pub mod promotion;
pub mod sale;
pub mod sequence;
pub mod session;
