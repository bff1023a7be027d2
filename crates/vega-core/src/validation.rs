//! # Validation Module
//!
//! Input checks that run before any write.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Register UI                                                   │
//! │  └── Immediate feedback (empty fields, obvious typos)                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Field rules, raised as ValidationError before any write            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (quantity >= 0), CHECK (store_credit_cents >= 0)             │
//! │  ├── UNIQUE (sale number), partial UNIQUE (open session per cashier)    │
//! │  └── Foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vega_core::validation::{validate_quantity, validate_required};
//!
//! validate_required("register_id", "REG-01").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text reason accepted (cancellations, adjustments).
pub const MAX_REASON_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects empty or whitespace-only values.
///
/// ```rust
/// use vega_core::validation::validate_required;
///
/// assert!(validate_required("cashier_id", "ana").is_ok());
/// assert!(validate_required("cashier_id", "   ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Validates a free-text reason (layaway cancellation, stock adjustment).
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_REASON_LEN`] characters
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::required("reason"));
    }

    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(())
}

/// Validates a terminal code used in sale numbers.
///
/// ## Rules
/// - 1 to 8 ASCII alphanumeric characters
pub fn validate_terminal_code(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::required("terminal_code"));
    }

    if code.len() > 8 {
        return Err(ValidationError::TooLong {
            field: "terminal_code".to_string(),
            max: 8,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "terminal_code".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Line                                                         │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                             │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                   │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → MustBePositive                                   │
/// │       ├── qty > 999? → OutOfRange                                       │
/// │       └── OK → Cart::add_line                                           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents. Zero is allowed (free items).
///
/// ```rust
/// use vega_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(i64::MAX).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    if cents > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents. Zero and negative amounts are rejected.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates an operator-entered cash count (opening or closing drawer).
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in a cart holding `current_items`.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string (client-supplied ids such as layaway payment ids).
///
/// ```rust
/// use vega_core::validation::validate_uuid;
///
/// assert!(validate_uuid("payment_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("payment_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("register_id", "REG-01").is_ok());
        assert!(validate_required("register_id", "").is_err());
        assert!(validate_required("register_id", "  \t").is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("customer changed their mind").is_ok());
        assert!(validate_reason("").is_err());
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_terminal_code() {
        assert!(validate_terminal_code("01").is_ok());
        assert!(validate_terminal_code("T2").is_ok());
        assert!(validate_terminal_code("").is_err());
        assert!(validate_terminal_code("0-1").is_err());
        assert!(validate_terminal_code("123456789").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_price_cents(MAX_UNIT_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents(MAX_UNIT_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));

        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());

        assert!(validate_non_negative_cents("opening cash", 0).is_ok());
        assert!(validate_non_negative_cents("opening cash", -500).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1600).is_ok());
        assert!(validate_tax_rate_bps(10_000).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }
}
