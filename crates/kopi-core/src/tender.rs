//! # Tender Module
//!
//! The ordered list of payment tenders offered toward an order.
//!
//! ## Split Tender
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Amount due: $30.60                                                     │
//! │                                                                         │
//! │  [0] Cash    $20.00                                                     │
//! │  [1] PayNow  $10.60      ◄── present only when split is toggled on      │
//! │  ───────────────────                                                    │
//! │  Received    $30.60      Change $0.00                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The list order matters: allocation walks it left to right.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::validate_tender_amount;
use crate::MAX_SPLIT_TENDERS;

/// One payment method/amount pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tender {
    pub method: PaymentMethod,
    pub amount: Money,
}

impl Tender {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        Tender { method, amount }
    }
}

/// Ordered tender list with a bounded length.
///
/// ## Invariants
/// - `1 <= len <= max_len`
/// - Every amount is non-negative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderList {
    tenders: Vec<Tender>,
    max_len: usize,
}

impl Default for TenderList {
    fn default() -> Self {
        TenderList::new(MAX_SPLIT_TENDERS)
    }
}

impl TenderList {
    /// Creates a list holding one zero Cash tender.
    pub fn new(max_len: usize) -> Self {
        TenderList {
            tenders: vec![Tender::default()],
            max_len: max_len.max(1),
        }
    }

    /// Creates a list from explicit tenders.
    ///
    /// ## Errors
    /// - `TenderCount` if the list is empty or longer than `max_len`
    /// - `Validation` if any amount is negative
    pub fn from_tenders(tenders: Vec<Tender>, max_len: usize) -> CoreResult<Self> {
        let max_len = max_len.max(1);
        if tenders.is_empty() || tenders.len() > max_len {
            return Err(CoreError::TenderCount {
                len: tenders.len(),
                min: 1,
                max: max_len,
            });
        }
        for tender in &tenders {
            validate_tender_amount(tender.amount)?;
        }
        Ok(TenderList { tenders, max_len })
    }

    pub fn len(&self) -> usize {
        self.tenders.len()
    }

    /// Always false: the list holds at least one tender.
    pub fn is_empty(&self) -> bool {
        self.tenders.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn as_slice(&self) -> &[Tender] {
        &self.tenders
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tender> {
        self.tenders.iter()
    }

    pub fn get(&self, index: usize) -> CoreResult<&Tender> {
        self.tenders.get(index).ok_or(CoreError::TenderOutOfRange {
            index,
            len: self.tenders.len(),
        })
    }

    fn get_mut(&mut self, index: usize) -> CoreResult<&mut Tender> {
        let len = self.tenders.len();
        self.tenders
            .get_mut(index)
            .ok_or(CoreError::TenderOutOfRange { index, len })
    }

    /// Returns true if more than one tender is in use.
    pub fn is_split(&self) -> bool {
        self.tenders.len() > 1
    }

    /// Grows the list to `max_len` (split on) or shrinks it to one tender
    /// (split off). Tenders dropped by shrinking are discarded.
    pub fn set_split(&mut self, split: bool) {
        if split {
            while self.tenders.len() < self.max_len {
                self.tenders.push(Tender::default());
            }
        } else {
            self.tenders.truncate(1);
        }
    }

    pub fn set_method(&mut self, index: usize, method: PaymentMethod) -> CoreResult<()> {
        self.get_mut(index)?.method = method;
        Ok(())
    }

    pub fn set_amount(&mut self, index: usize, amount: Money) -> CoreResult<()> {
        validate_tender_amount(amount)?;
        self.get_mut(index)?.amount = amount;
        Ok(())
    }

    /// Sum of all tender amounts.
    pub fn total_received(&self) -> Money {
        self.tenders.iter().map(|t| t.amount).sum()
    }

    /// Change owed: received minus due. Negative means underpayment.
    pub fn change(&self, due: Money) -> Money {
        self.total_received() - due
    }

    /// Sum of every tender amount except `index`.
    pub fn received_excluding(&self, index: usize) -> Money {
        self.tenders
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, t)| t.amount)
            .sum()
    }

    /// Comma-joined ERP method names, in list order: `"Cash,PayNow"`.
    pub fn methods_summary(&self) -> String {
        self.tenders
            .iter()
            .map(|t| t.method.erp_name())
            .collect::<Vec<_>>()
            .join(",")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_list_has_one_zero_cash_tender() {
        let list = TenderList::default();
        assert_eq!(list.len(), 1);
        assert_eq!(list.as_slice()[0], Tender::new(PaymentMethod::Cash, Money::zero()));
        assert!(!list.is_split());
    }

    #[test]
    fn test_split_toggle_stays_within_bounds() {
        let mut list = TenderList::new(2);
        list.set_split(true);
        assert_eq!(list.len(), 2);
        list.set_split(true);
        assert_eq!(list.len(), 2);
        list.set_split(false);
        assert_eq!(list.len(), 1);
        list.set_split(false);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_change_and_received() {
        let mut list = TenderList::new(2);
        list.set_split(true);
        list.set_amount(0, Money::from_cents(2000)).unwrap();
        list.set_method(1, PaymentMethod::PayNow).unwrap();
        list.set_amount(1, Money::from_cents(1060)).unwrap();

        assert_eq!(list.total_received().cents(), 3060);
        assert!(list.change(Money::from_cents(3060)).is_zero());
        assert_eq!(list.change(Money::from_cents(3100)).cents(), -40);
        assert_eq!(list.received_excluding(1).cents(), 2000);
        assert_eq!(list.methods_summary(), "Cash,PayNow");
    }

    #[test]
    fn test_rejects_negative_amount_and_bad_index() {
        let mut list = TenderList::new(2);
        assert!(list.set_amount(0, Money::from_cents(-5)).is_err());
        assert!(matches!(
            list.set_method(3, PaymentMethod::Card),
            Err(CoreError::TenderOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_from_tenders_bounds() {
        assert!(TenderList::from_tenders(vec![], 2).is_err());
        let three = vec![Tender::default(); 3];
        assert!(TenderList::from_tenders(three.clone(), 2).is_err());
        assert_eq!(TenderList::from_tenders(three, 3).unwrap().len(), 3);
    }
}
