//! # vega-db: Database Layer and Engine Services for Vega POS
//!
//! Every durable write of the POS engine goes through this crate. It uses
//! SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vega POS Data Flow                               │
//! │                                                                         │
//! │  Register UI / command layer                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     vega-db (THIS CRATE)                        │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Services    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │               │    │               │    │  (embedded)  │    │    │
//! │  │   │ SaleCommit    │───►│ SaleRepo      │    │ 001_initial  │    │    │
//! │  │   │ CashRegister  │    │ SessionRepo   │    │              │    │    │
//! │  │   │ LayawayLedger │    │ LayawayRepo   │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │          │                     │                                │    │
//! │  │          ▼                     ▼                                │    │
//! │  │   vega-core (pricing,    Database (pool.rs)                     │    │
//! │  │   state machines)        SqlitePool, WAL                        │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (platform data dir)/vega.db                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `vega.toml` + environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`service`] - Sale commit engine, cash register, layaway ledger
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vega_core::SystemClock;
//! use vega_db::{Database, DbConfig, PosConfig, SaleCommitEngine};
//!
//! let config = PosConfig::load_or_default(None);
//! let db = Database::new(DbConfig::from(&config.database)).await?;
//! let engine = SaleCommitEngine::new(db, config, Arc::new(SystemClock));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::PosConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::layaway::{LayawayRepository, LayawayRequest};
pub use repository::promotion::PromotionRepository;
pub use repository::sale::{CommittedSale, SaleDraft, SaleRepository};
pub use repository::session::SessionRepository;

pub use service::checkout::{CommitRequest, SaleCommitEngine};
pub use service::layaway::LayawayLedger;
pub use service::register::{CashRegister, SessionClose};
