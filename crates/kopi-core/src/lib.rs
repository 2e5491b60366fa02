//! # kopi-core: Pure Checkout Logic for Kopi POS
//!
//! This crate is the **heart** of Kopi POS. It contains the checkout rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kopi POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    kopi-cli (operator binary)                   │   │
//! │  │    open-orders ──► checkout ──► create-item                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kopi-orchestrator                            │   │
//! │  │    CheckoutSession, PayNow poller, inventory saga               │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────────┐  ┌───────▼───────────────────┐   │
//! │  │  ★ kopi-core (THIS CRATE) ★     │  │  kopi-gateway              │   │
//! │  │                                 │  │  ERP + payment clients     │   │
//! │  │  money · types · tender         │  │  (reqwest)                 │   │
//! │  │  allocation · checkout          │  └────────────────────────────┘   │
//! │  │  inventory · validation         │                                    │
//! │  │                                 │                                    │
//! │  │  NO I/O • NO NETWORK            │                                    │
//! │  └─────────────────────────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`types`] - Orders, payment methods, discount rates
//! - [`tender`] - The split-tender list
//! - [`allocation`] - Tender-to-invoice allocation reducer
//! - [`checkout`] - Checkout state machine and completion journal
//! - [`inventory`] - New item template/variant input
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use kopi_core::money::Money;
//! use kopi_core::types::DiscountRate;
//!
//! let net = Money::from_cents(3400); // $34.00
//! let discounted = net.apply_discount(DiscountRate::from_percentage(10.0));
//!
//! assert_eq!(discounted.cents(), 3060);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod money;
pub mod tender;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{plan_allocations, Allocation, AllocationPlan};
pub use checkout::{
    CardStatus, CheckoutJournal, CheckoutPhase, CheckoutState, CompletionPlan, CompletionStep,
    PayNowStatus,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{NewItemSpec, VariantSpec};
pub use money::Money;
pub use tender::{Tender, TenderList};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum tenders in one checkout session.
///
/// The counter offers a single tender or a two-way split. The allocation
/// reducer itself accepts any length.
pub const MAX_SPLIT_TENDERS: usize = 2;

/// Maximum quantity of a single item on an order.
pub const MAX_ITEM_QUANTITY: i64 = 999;
