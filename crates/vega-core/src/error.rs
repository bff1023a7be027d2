//! # Error Types
//!
//! Domain-specific error types for vega-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vega-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule rejections                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  vega-db errors (separate crate)                                       │
//! │  └── DbError          - Persistence failures, wraps CoreError          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every business-rule variant carries enough context to say which invariant
//! failed (which variant lacked stock, which customer lacked credit).

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// None of these are ever partially applied: the operation that raised them
/// wrote nothing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock for a cart line at commit time.
    ///
    /// ## User Workflow
    /// ```text
    /// Tender (qty: 2 of TEE-M)
    ///      │
    ///      ▼
    /// Conditional decrement: available=1
    ///      │
    ///      ▼
    /// InsufficientStock { variant_id: "TEE-M", available: 1, requested: 2 }
    ///      │
    ///      ▼
    /// UI shows: "Only 1 TEE-M in stock"
    /// ```
    #[error("Insufficient stock for variant {variant_id}: available {available}, requested {requested}")]
    InsufficientStock {
        variant_id: String,
        available: i64,
        requested: i64,
    },

    /// Store-credit payment exceeds the customer's balance.
    #[error("Insufficient store credit for customer {customer_id}: available {available_cents}, required {required_cents}")]
    InsufficientCredit {
        customer_id: String,
        available_cents: i64,
        required_cents: i64,
    },

    /// Payment does not satisfy the sale (wrong amount, bad tender).
    #[error("Invalid payment: {reason}")]
    InvalidPayment { reason: String },

    /// The cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Variant is not in the cart.
    #[error("Variant {0} not in cart")]
    LineNotFound(String),

    /// Cashier already has an open cash session.
    #[error("Cashier {cashier_id} already has an open cash session")]
    SessionAlreadyOpen { cashier_id: String },

    /// Cash session is not in a state that allows the operation.
    #[error("Cash session {session_id} is {status}, cannot perform operation")]
    InvalidSessionStatus { session_id: String, status: String },

    /// Expected cash could not be computed; the session stays open.
    #[error("Expected cash for session {session_id} could not be computed: {reason}")]
    AggregationFailure { session_id: String, reason: String },

    /// Layaway is not in a state that allows the operation.
    #[error("Layaway {layaway_id} is {status}, cannot perform operation")]
    InvalidLayawayStatus { layaway_id: String, status: String },

    /// Payment would push a layaway past its total price.
    #[error("Payment of {attempted_cents} exceeds layaway balance of {balance_cents}")]
    Overpayment {
        balance_cents: i64,
        attempted_cents: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidPayment`].
    pub fn invalid_payment(reason: impl Into<String>) -> Self {
        CoreError::InvalidPayment {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write; safe to retry once the caller fixes the input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            variant_id: "TEE-M".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for variant TEE-M: available 1, requested 2"
        );

        let err = CoreError::Overpayment {
            balance_cents: 70_000,
            attempted_cents: 80_000,
        };
        assert_eq!(
            err.to_string(),
            "Payment of 80000 exceeds layaway balance of 70000"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("register_id");
        assert_eq!(err.to_string(), "register_id is required");

        let err = ValidationError::MustNotBeNegative {
            field: "opening cash".to_string(),
        };
        assert_eq!(err.to_string(), "opening cash must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("cart").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
