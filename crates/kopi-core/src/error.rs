//! # Error Types
//!
//! Domain-specific error types for kopi-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kopi-core errors (this file)                                          │
//! │  ├── CoreError        - Checkout rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kopi-gateway errors (separate crate)                                  │
//! │  └── GatewayError     - ERP / payment gateway failures                 │
//! │                                                                         │
//! │  kopi-orchestrator errors                                              │
//! │  └── CheckoutError    - What the operator sees                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → operator          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every CoreError is raised BEFORE any network call. If one of these
//! reaches the operator, no ERP document was touched.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Checkout rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No order has been loaded into the session.
    #[error("No order loaded for checkout")]
    OrderNotLoaded,

    /// The order has already been invoiced and paid.
    #[error("Order {0} is already completed")]
    OrderAlreadyCompleted(String),

    /// Tendered amounts do not cover the amount due.
    ///
    /// ## User Workflow
    /// ```text
    /// Amount due: $30.60
    /// Tendered:   Cash $20.00
    ///      │
    ///      ▼
    /// Underpaid { due: $30.60, received: $20.00 }
    ///      │
    ///      ▼
    /// UI shows: "Amount received $20.00 is less than $30.60 due"
    /// ```
    #[error("Amount received {received} is less than {due} due")]
    Underpaid { due: Money, received: Money },

    /// Tender index is outside the tender list.
    #[error("No tender at position {index} (have {len})")]
    TenderOutOfRange { index: usize, len: usize },

    /// Tender list length outside the allowed range.
    #[error("Tender list must have between {min} and {max} entries, got {len}")]
    TenderCount { len: usize, min: usize, max: usize },

    /// The tender at this index uses the wrong method for the flow.
    #[error("Tender {index} uses {actual}, expected {expected}")]
    WrongMethod {
        index: usize,
        expected: String,
        actual: String,
    },

    /// The checkout plan is frozen because ERP documents already exist.
    #[error("Checkout for order {order_id} is locked: ERP documents already created")]
    PlanFrozen { order_id: String },

    /// The tender was already paid on the terminal or by PayNow.
    #[error("Tender {index} is already paid ({method}); complete the checkout instead")]
    TenderSettled { index: usize, method: String },

    /// A PayNow intent id came back that was already polled once.
    #[error("PayNow intent {0} was already used")]
    IntentReused(String),

    /// The state machine does not permit this transition.
    #[error("Cannot {action} while checkout is {state}")]
    InvalidTransition { action: String, state: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
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

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
