//! # Domain Types
//!
//! Core domain types used throughout Kopi POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderLine     │   │  PaymentMethod  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (ERP name)  │   │  item_code      │   │  Cash           │       │
//! │  │  customer       │   │  qty            │   │  Card           │       │
//! │  │  lines          │   │  rate           │   │  Nets           │       │
//! │  │  discount       │   └─────────────────┘   │  PayNow         │       │
//! │  │  flags          │                         │  Cdc            │       │
//! │  └─────────────────┘   ┌─────────────────┐   └─────────────────┘       │
//! │                        │  DiscountRate   │                              │
//! │                        │  ─────────────  │                              │
//! │                        │  bps (u32)      │                              │
//! │                        │  1000 = 10%     │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! The ERP owns every document. Identifiers here are the ERP document
//! names (e.g. `SAL-ORD-2024-00042`), never locally generated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 12.5% is exactly 1250.
/// The rate is always within [0, 10000]: constructors clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Maximum rate (100%).
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a rate from basis points, clamped to 100%.
    #[inline]
    pub fn from_bps(bps: u32) -> Self {
        DiscountRate(bps.min(Self::MAX_BPS))
    }

    /// Creates a rate from a percentage, clamped to [0, 100].
    ///
    /// Non-finite input clamps to zero.
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::types::DiscountRate;
    ///
    /// assert_eq!(DiscountRate::from_percentage(10.0).bps(), 1000);
    /// assert_eq!(DiscountRate::from_percentage(150.0).bps(), 10000);
    /// assert_eq!(DiscountRate::from_percentage(-3.0).bps(), 0);
    /// ```
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() {
            return DiscountRate::zero();
        }
        let clamped = pct.clamp(0.0, 100.0);
        DiscountRate::from_bps((clamped * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (ERP wire format, display).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// The closed set of tender methods accepted at the counter.
///
/// ## Method Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cash, Cdc          → amount typed by cashier, no gateway call          │
/// │  Card, Nets         → card-present capture on the terminal              │
/// │  PayNow             → QR intent + status polling                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Debit or credit card on the terminal.
    Card,
    /// NETS card on the terminal.
    Nets,
    /// PayNow QR bank transfer.
    PayNow,
    /// CDC vouchers.
    Cdc,
}

impl PaymentMethod {
    /// All methods, in the order the counter lists them.
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Nets,
        PaymentMethod::PayNow,
        PaymentMethod::Cdc,
    ];

    /// The ERP "Mode of Payment" name for this method.
    pub fn erp_name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Debit/Credit Card",
            PaymentMethod::Nets => "NETS",
            PaymentMethod::PayNow => "PayNow",
            PaymentMethod::Cdc => "CDC",
        }
    }

    /// Returns true if this method is captured on the card terminal.
    pub fn is_card_present(&self) -> bool {
        matches!(self, PaymentMethod::Card | PaymentMethod::Nets)
    }

    /// Returns true if this method settles asynchronously (QR scan).
    pub fn is_async(&self) -> bool {
        matches!(self, PaymentMethod::PayNow)
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.erp_name())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "debit/credit card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "nets" => Ok(PaymentMethod::Nets),
            "paynow" | "pay_now" | "pay-now" => Ok(PaymentMethod::PayNow),
            "cdc" => Ok(PaymentMethod::Cdc),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.erp_name().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    /// ERP item code.
    pub item_code: String,

    /// Display name (optional, for receipts and logs).
    #[serde(default)]
    pub item_name: Option<String>,

    /// Quantity ordered.
    pub qty: i64,

    /// Unit price. `None` when the ERP has no price for the item.
    pub rate: Option<Money>,
}

impl OrderLine {
    /// Line total: `(rate or 0) × qty`.
    ///
    /// A missing rate counts as zero; it never turns the line total into
    /// the raw rate.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.rate.unwrap_or_default().multiply_quantity(self.qty)
    }
}

/// An open or completed sales order (kitchen ticket).
///
/// ## Lifecycle
/// ```text
/// created by cashier ──► open ticket ──► finalized ──► paid (terminal)
///                         (discount may    (completed   (payment_completed
///                          be set)          flag)        flag)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// ERP document name.
    pub id: String,

    /// Customer reference.
    pub customer: String,

    /// Order lines.
    pub lines: Vec<OrderLine>,

    /// Discount stored on the order (if any).
    #[serde(default)]
    pub discount: DiscountRate,

    /// Ticket finalized (kitchen done, discount + methods recorded).
    #[serde(default)]
    pub completed: bool,

    /// Invoice and payments recorded.
    #[serde(default)]
    pub payment_completed: bool,
}

impl Order {
    /// Gross total: sum of line totals.
    pub fn gross_total(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    /// Net total before the checkout discount is applied.
    ///
    /// Kopi orders carry no tax lines, so net equals gross.
    pub fn net_total(&self) -> Money {
        self.gross_total()
    }

    /// Returns true once both completion flags are set.
    pub fn is_terminal(&self) -> bool {
        self.completed && self.payment_completed
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
