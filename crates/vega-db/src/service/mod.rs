//! Engine services.
//!
//! Each service owns a [`Database`](crate::Database) handle and a
//! [`Clock`](vega_core::Clock); timestamps come from the clock, never from
//! the caller.

pub mod checkout;
pub mod layaway;
pub mod register;
