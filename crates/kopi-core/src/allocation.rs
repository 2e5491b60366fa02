//! # Allocation Module
//!
//! Splits the amount due across the tender list, producing one payment
//! entry per tender.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  remaining = T                                                          │
//! │  for tender in tenders (left to right):                                 │
//! │      allocated   = min(tender.amount, remaining)                        │
//! │      outstanding = remaining            (value BEFORE this tender)      │
//! │      emit entry { allocated, outstanding, total: T }                    │
//! │      remaining  -= allocated                                            │
//! │                                                                         │
//! │  Example: T = $20, tenders [A $10, B $15]                               │
//! │    A: allocated $10, outstanding $20                                    │
//! │    B: allocated $10, outstanding $10   ◄── B absorbs only what is left  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every tender yields an entry, including zero-amount tenders and tenders
//! that arrive after the balance is settled. The plan is computed in full
//! before any ERP write, so the sequential writes that follow never read
//! shared mutable state.
//!
//! Rounding to two decimals is implicit: amounts are integer cents.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::tender::Tender;
use crate::types::PaymentMethod;

/// One planned payment entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Position in the tender list.
    pub index: usize,

    pub method: PaymentMethod,

    /// What the customer handed over for this tender.
    pub tendered: Money,

    /// Applied against the invoice: `min(tendered, outstanding)`.
    pub allocated: Money,

    /// Invoice balance before this entry.
    pub outstanding: Money,

    /// Invoice grand total.
    pub total: Money,
}

/// The full allocation plan for one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub total: Money,
    pub entries: Vec<Allocation>,
}

impl AllocationPlan {
    /// Sum of allocated amounts.
    pub fn total_allocated(&self) -> Money {
        self.entries.iter().map(|e| e.allocated).sum()
    }

    /// Balance left after every entry is applied.
    pub fn remaining(&self) -> Money {
        self.total - self.total_allocated()
    }
}

/// Computes the allocation plan for `total` over `tenders`.
///
/// ## Example
/// ```rust
/// use kopi_core::allocation::plan_allocations;
/// use kopi_core::tender::Tender;
/// use kopi_core::{Money, PaymentMethod};
///
/// let plan = plan_allocations(
///     Money::from_cents(2000),
///     &[
///         Tender::new(PaymentMethod::Cash, Money::from_cents(1000)),
///         Tender::new(PaymentMethod::PayNow, Money::from_cents(1500)),
///     ],
/// );
/// assert_eq!(plan.entries[0].allocated.cents(), 1000);
/// assert_eq!(plan.entries[1].allocated.cents(), 1000);
/// ```
pub fn plan_allocations(total: Money, tenders: &[Tender]) -> AllocationPlan {
    let mut remaining = total;
    let mut entries = Vec::with_capacity(tenders.len());

    for (index, tender) in tenders.iter().enumerate() {
        // Floor at zero: a negative tender or an overpaid balance never
        // produces a negative allocation.
        let allocated = tender.amount.min(remaining).max(Money::zero());
        entries.push(Allocation {
            index,
            method: tender.method,
            tendered: tender.amount,
            allocated,
            outstanding: remaining,
            total,
        });
        remaining -= allocated;
    }

    AllocationPlan { total, entries }
}

// =============================================================================
// Unit Tests
// =============================================================================
