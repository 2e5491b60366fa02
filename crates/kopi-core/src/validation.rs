//! # Validation Module
//!
//! Input validation utilities for Kopi POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Operator input (CLI / UI)                                    │
//! │  ├── Parsing (amounts, methods)                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Business rule validation BEFORE any ERP call                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: ERP                                                          │
//! │  ├── Mandatory fields, links, submitted-document rules                 │
//! │                                                                         │
//! │  A request rejected at layer 2 never reaches the ERP                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::OrderLine;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an ERP item code.
///
/// ## Rules
/// - Must not be empty
/// - At most 140 characters (the ERP's name length)
///
/// ## Example
/// ```rust
/// use kopi_core::validation::validate_item_code;
///
/// assert!(validate_item_code("KOPI-O-KOSONG").is_ok());
/// assert!(validate_item_code("").is_err());
/// ```
pub fn validate_item_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "item_code".to_string(),
        });
    }

    if code.len() > 140 {
        return Err(ValidationError::TooLong {
            field: "item_code".to_string(),
            max: 140,
        });
    }

    Ok(())
}

/// Validates a customer reference.
pub fn validate_customer(customer: &str) -> ValidationResult<()> {
    if customer.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
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

/// Validates a tender amount.
///
/// ## Rules
/// - Must be non-negative
/// - Zero is allowed (a tender not yet filled in)
pub fn validate_tender_amount(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "tender amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a price.
///
/// ## Example
/// ```rust
/// use kopi_core::money::Money;
/// use kopi_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(180)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-1)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the lines of a new order.
///
/// ## Rules
/// - At least one line
/// - Every line has a valid item code and quantity
/// - Known rates are non-negative
pub fn validate_order_lines(lines: &[OrderLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "order lines".to_string(),
        });
    }

    for line in lines {
        validate_item_code(&line.item_code)?;
        validate_quantity(line.qty)?;
        if let Some(rate) = line.rate {
            validate_price(rate)?;
        }
    }

    Ok(())
}

/// Validates that a list of names contains no duplicates (case-insensitive).
pub fn validate_unique<'a>(
    field: &str,
    values: impl IntoIterator<Item = &'a str>,
) -> ValidationResult<()> {
    let mut seen = std::collections::HashSet::new();
    for value in values {
        if !seen.insert(value.trim().to_lowercase()) {
            return Err(ValidationError::Duplicate {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_item_code() {
        assert!(validate_item_code("KOPI-C").is_ok());
        assert!(validate_item_code("Nasi Lemak (Large)").is_ok());
        assert!(validate_item_code("").is_err());
        assert!(validate_item_code("   ").is_err());
        assert!(validate_item_code(&"A".repeat(141)).is_err());
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
    fn test_validate_tender_amount() {
        assert!(validate_tender_amount(Money::zero()).is_ok());
        assert!(validate_tender_amount(Money::from_cents(2000)).is_ok());
        assert!(validate_tender_amount(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_order_lines() {
        assert!(validate_order_lines(&[]).is_err());

        let ok = OrderLine {
            item_code: "TEH-O".into(),
            item_name: None,
            qty: 2,
            rate: Some(Money::from_cents(150)),
        };
        assert!(validate_order_lines(&[ok.clone()]).is_ok());

        let bad = OrderLine { qty: 0, ..ok };
        assert!(validate_order_lines(&[bad]).is_err());
    }

    #[test]
    fn test_validate_unique() {
        assert!(validate_unique("variant", ["Small", "Large"]).is_ok());
        assert!(validate_unique("variant", ["Small", "small "]).is_err());
    }
}
