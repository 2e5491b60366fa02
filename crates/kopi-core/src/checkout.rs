//! # Checkout State Machine
//!
//! The pure, I/O-free half of a checkout session. The orchestrator drives
//! the ERP and payment gateways; this module decides which transitions are
//! legal and what the next ERP write must be.
//!
//! ## State Machines
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Main                                                                   │
//! │    Idle ──prepare_completion()──► ReadyToComplete ──► Completed         │
//! │      ▲                                   │                              │
//! │      └──────── retry ◄─── Failed ◄───────┘                              │
//! │                                                                         │
//! │  Card (per session)                                                     │
//! │    Idle ──► AwaitingCardPresent ──► Captured                            │
//! │                     └─────────────► Failed (status, session open)       │
//! │                                                                         │
//! │  PayNow (per intent)                                                    │
//! │    Idle ──► Requesting ──► AwaitingScan ──► Succeeded                   │
//! │                  │               └────────► TimedOut                    │
//! │                  └─────────────────────────► Failed                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Journal
//! Every ERP document created during completion is recorded in the
//! [`CheckoutJournal`]. After the first write the [`CompletionPlan`] is
//! frozen: discount and tenders can no longer change, and a retry resumes
//! at [`CheckoutJournal::next_step`] instead of creating duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::allocation::{plan_allocations, AllocationPlan};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::tender::TenderList;
use crate::types::{DiscountRate, Order, OrderLine, PaymentMethod};

// =============================================================================
// Status Types
// =============================================================================

/// Main checkout phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CheckoutPhase {
    Idle,
    ReadyToComplete,
    Completed,
    Failed { message: String },
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutPhase::Idle => f.write_str("idle"),
            CheckoutPhase::ReadyToComplete => f.write_str("ready to complete"),
            CheckoutPhase::Completed => f.write_str("completed"),
            CheckoutPhase::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// Card terminal capture status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CardStatus {
    Idle,
    AwaitingCardPresent { index: usize },
    Captured { index: usize, amount: Money },
    Failed { index: usize, message: String },
}

/// PayNow intent status.
///
/// `Succeeded` and `TimedOut` are terminal for their intent id. A new
/// attempt after a timeout must come back with a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PayNowStatus {
    Idle,
    Requesting {
        index: usize,
        amount: Money,
    },
    AwaitingScan {
        index: usize,
        amount: Money,
        intent_id: String,
    },
    Succeeded {
        index: usize,
        intent_id: String,
    },
    TimedOut {
        index: usize,
        intent_id: String,
    },
    Failed {
        index: usize,
        message: String,
    },
}

impl PayNowStatus {
    /// Short name for logs and transition errors.
    pub fn label(&self) -> &'static str {
        match self {
            PayNowStatus::Idle => "idle",
            PayNowStatus::Requesting { .. } => "requesting",
            PayNowStatus::AwaitingScan { .. } => "awaiting scan",
            PayNowStatus::Succeeded { .. } => "succeeded",
            PayNowStatus::TimedOut { .. } => "timed out",
            PayNowStatus::Failed { .. } => "failed",
        }
    }

    /// Returns true while an intent request or poll is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            PayNowStatus::Requesting { .. } | PayNowStatus::AwaitingScan { .. }
        )
    }
}

// =============================================================================
// Completion Plan & Journal
// =============================================================================

/// Everything the completion sequence writes, fixed before the first call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionPlan {
    /// Identifies one checkout attempt across retries.
    pub attempt_id: Uuid,
    pub order_id: String,
    pub customer: String,
    pub lines: Vec<OrderLine>,
    pub discount: DiscountRate,
    pub net_total: Money,
    /// Discounted total; the invoice grand total.
    pub total_due: Money,
    pub change: Money,
    /// Comma-joined ERP method names.
    pub methods_summary: String,
    pub allocations: AllocationPlan,
}

/// The next ERP write a completion attempt must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStep {
    FinalizeTicket,
    CreateInvoice,
    /// Payment entry for the allocation at this position.
    CreatePaymentEntry(usize),
    MarkOrderPaid,
}

impl fmt::Display for CompletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionStep::FinalizeTicket => f.write_str("finalize ticket"),
            CompletionStep::CreateInvoice => f.write_str("create invoice"),
            CompletionStep::CreatePaymentEntry(i) => write!(f, "create payment entry {i}"),
            CompletionStep::MarkOrderPaid => f.write_str("mark order paid"),
        }
    }
}

/// ERP documents created by the current attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckoutJournal {
    pub ticket_finalized: bool,
    pub invoice: Option<String>,
    pub payment_entries: Vec<String>,
    pub order_marked_paid: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CheckoutJournal {
    /// Returns true if any ERP write has succeeded.
    pub fn has_writes(&self) -> bool {
        self.ticket_finalized || self.invoice.is_some()
    }

    /// First unfinished step for `plan`, or `None` when everything is written.
    pub fn next_step(&self, plan: &CompletionPlan) -> Option<CompletionStep> {
        if !self.ticket_finalized {
            return Some(CompletionStep::FinalizeTicket);
        }
        if self.invoice.is_none() {
            return Some(CompletionStep::CreateInvoice);
        }
        if self.payment_entries.len() < plan.allocations.entries.len() {
            return Some(CompletionStep::CreatePaymentEntry(self.payment_entries.len()));
        }
        if !self.order_marked_paid {
            return Some(CompletionStep::MarkOrderPaid);
        }
        None
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

// =============================================================================
// Checkout State
// =============================================================================

/// One checkout session's local state.
///
/// The only mutable state the orchestrator keeps: the loaded order, the
/// discount and tender list, the card/PayNow statuses, and the journal.
#[derive(Debug, Clone)]
pub struct CheckoutState {
    order: Option<Order>,
    discount_enabled: bool,
    discount: DiscountRate,
    tenders: TenderList,
    phase: CheckoutPhase,
    card: CardStatus,
    paynow: PayNowStatus,
    journal: CheckoutJournal,
    plan: Option<CompletionPlan>,
    spent_intents: Vec<String>,
}

impl Default for CheckoutState {
    fn default() -> Self {
        CheckoutState::new(TenderList::default())
    }
}

impl CheckoutState {
    pub fn new(tenders: TenderList) -> Self {
        CheckoutState {
            order: None,
            discount_enabled: false,
            discount: DiscountRate::zero(),
            tenders,
            phase: CheckoutPhase::Idle,
            card: CardStatus::Idle,
            paynow: PayNowStatus::Idle,
            journal: CheckoutJournal::default(),
            plan: None,
            spent_intents: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn phase(&self) -> &CheckoutPhase {
        &self.phase
    }

    pub fn card_status(&self) -> &CardStatus {
        &self.card
    }

    pub fn paynow_status(&self) -> &PayNowStatus {
        &self.paynow
    }

    pub fn journal(&self) -> &CheckoutJournal {
        &self.journal
    }

    pub fn tenders(&self) -> &TenderList {
        &self.tenders
    }

    pub fn discount(&self) -> DiscountRate {
        self.discount
    }

    pub fn discount_enabled(&self) -> bool {
        self.discount_enabled
    }

    /// The frozen plan, once the first ERP write has succeeded.
    pub fn frozen_plan(&self) -> Option<&CompletionPlan> {
        self.plan.as_ref().filter(|_| self.journal.has_writes())
    }

    /// Net total minus the discount; zero when no order is loaded.
    pub fn discounted_total(&self) -> Money {
        self.order
            .as_ref()
            .map(|o| o.net_total().apply_discount(self.discount))
            .unwrap_or_default()
    }

    /// Received minus discounted total. Negative blocks completion.
    pub fn change(&self) -> Money {
        self.tenders.change(self.discounted_total())
    }

    // -------------------------------------------------------------------------
    // Order & Discount
    // -------------------------------------------------------------------------

    /// Loads an order, resetting discount, tenders, statuses and journal.
    pub fn load_order(&mut self, order: Order) -> CoreResult<()> {
        if order.is_terminal() {
            return Err(CoreError::OrderAlreadyCompleted(order.id));
        }
        let max_len = self.tenders.max_len();
        *self = CheckoutState::new(TenderList::new(max_len));
        self.order = Some(order);
        Ok(())
    }

    /// Turns discount mode on or off. Either way the rate resets to 0%.
    pub fn enable_discount(&mut self, enabled: bool) -> CoreResult<()> {
        self.ensure_editable("change discount")?;
        self.discount_enabled = enabled;
        self.discount = DiscountRate::zero();
        Ok(())
    }

    /// Sets the discount percentage, clamped to [0, 100].
    pub fn set_discount_percentage(&mut self, pct: f64) -> CoreResult<DiscountRate> {
        self.ensure_editable("change discount")?;
        if !self.discount_enabled {
            return Err(self.transition_error("set discount without discount mode"));
        }
        self.discount = DiscountRate::from_percentage(pct);
        Ok(self.discount)
    }

    // -------------------------------------------------------------------------
    // Tenders
    // -------------------------------------------------------------------------

    /// Toggles the split. Shrinking never drops a tender that is already paid.
    pub fn set_split(&mut self, split: bool) -> CoreResult<()> {
        self.ensure_editable("change tenders")?;
        if !split {
            for index in 1..self.tenders.len() {
                self.ensure_unsettled(index)?;
            }
        }
        self.tenders.set_split(split);
        Ok(())
    }

    pub fn set_tender_method(&mut self, index: usize, method: PaymentMethod) -> CoreResult<()> {
        self.ensure_editable("change tenders")?;
        self.ensure_unsettled(index)?;
        self.tenders.set_method(index, method)
    }

    pub fn set_tender_amount(&mut self, index: usize, amount: Money) -> CoreResult<()> {
        self.ensure_editable("change tenders")?;
        self.ensure_unsettled(index)?;
        self.tenders.set_amount(index, amount)
    }

    // -------------------------------------------------------------------------
    // Completion
    // -------------------------------------------------------------------------

    /// Validates the session and returns the plan to execute.
    ///
    /// Runs before any ERP call. A frozen plan is returned unchanged so a
    /// retry writes exactly what the first attempt started.
    ///
    /// ## Errors
    /// - `InvalidTransition` if already completed
    /// - `OrderNotLoaded` / `OrderAlreadyCompleted`
    /// - `Underpaid` if received < discounted total
    pub fn prepare_completion(&mut self) -> CoreResult<CompletionPlan> {
        if self.phase == CheckoutPhase::Completed {
            return Err(self.transition_error("complete"));
        }
        if let Some(plan) = self.frozen_plan().cloned() {
            self.phase = CheckoutPhase::ReadyToComplete;
            return Ok(plan);
        }

        let order = self.order.as_ref().ok_or(CoreError::OrderNotLoaded)?;
        if order.is_terminal() {
            return Err(CoreError::OrderAlreadyCompleted(order.id.clone()));
        }

        let due = self.discounted_total();
        let received = self.tenders.total_received();
        if received < due {
            return Err(CoreError::Underpaid { due, received });
        }

        let plan = CompletionPlan {
            attempt_id: Uuid::new_v4(),
            order_id: order.id.clone(),
            customer: order.customer.clone(),
            lines: order.lines.clone(),
            discount: self.discount,
            net_total: order.net_total(),
            total_due: due,
            change: received - due,
            methods_summary: self.tenders.methods_summary(),
            allocations: plan_allocations(due, self.tenders.as_slice()),
        };
        self.plan = Some(plan.clone());
        self.phase = CheckoutPhase::ReadyToComplete;
        Ok(plan)
    }

    /// Next ERP write for the current plan.
    pub fn next_step(&self) -> Option<CompletionStep> {
        self.plan.as_ref().and_then(|p| self.journal.next_step(p))
    }

    pub fn record_ticket_finalized(&mut self) {
        self.journal.ticket_finalized = true;
        if let Some(order) = self.order.as_mut() {
            order.completed = true;
            order.discount = self.discount;
        }
        self.journal.touch();
    }

    pub fn record_invoice(&mut self, invoice: impl Into<String>) {
        self.journal.invoice = Some(invoice.into());
        self.journal.touch();
    }

    pub fn record_payment_entry(&mut self, entry: impl Into<String>) {
        self.journal.payment_entries.push(entry.into());
        self.journal.touch();
    }

    pub fn record_order_paid(&mut self) {
        self.journal.order_marked_paid = true;
        if let Some(order) = self.order.as_mut() {
            order.payment_completed = true;
        }
        self.journal.touch();
    }

    /// Transitions to Completed once every step is journaled.
    pub fn mark_completed(&mut self) -> CoreResult<()> {
        if self.next_step().is_some() || self.plan.is_none() {
            return Err(self.transition_error("mark completed"));
        }
        self.phase = CheckoutPhase::Completed;
        Ok(())
    }

    /// Transitions to Failed. The journal is kept for the retry.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.phase = CheckoutPhase::Failed {
            message: message.into(),
        };
    }

    // -------------------------------------------------------------------------
    // Card Terminal
    // -------------------------------------------------------------------------

    /// Starts a card-present capture for the tender at `index`.
    ///
    /// Returns the amount to request: the discounted total. A tender that
    /// was already captured is never charged again; retry completion instead.
    pub fn begin_card_capture(&mut self, index: usize) -> CoreResult<Money> {
        self.ensure_editable("capture card")?;
        if self.order.is_none() {
            return Err(CoreError::OrderNotLoaded);
        }
        let tender = *self.tenders.get(index)?;
        if !tender.method.is_card_present() {
            return Err(CoreError::WrongMethod {
                index,
                expected: "a card-present method".to_string(),
                actual: tender.method.erp_name().to_string(),
            });
        }
        self.ensure_unsettled(index)?;
        if matches!(self.card, CardStatus::AwaitingCardPresent { .. }) {
            return Err(self.transition_error("start a second card capture"));
        }
        self.card = CardStatus::AwaitingCardPresent { index };
        Ok(self.discounted_total())
    }

    /// Records a successful capture; the tender takes the captured amount.
    pub fn record_card_captured(&mut self, index: usize, amount: Money) -> CoreResult<()> {
        if self.card != (CardStatus::AwaitingCardPresent { index }) {
            return Err(self.transition_error("record card capture"));
        }
        self.tenders.set_amount(index, amount)?;
        self.card = CardStatus::Captured { index, amount };
        Ok(())
    }

    /// Records a capture failure. The session stays open.
    pub fn record_card_failed(&mut self, index: usize, message: impl Into<String>) {
        self.card = CardStatus::Failed {
            index,
            message: message.into(),
        };
    }

    // -------------------------------------------------------------------------
    // PayNow
    // -------------------------------------------------------------------------

    /// Starts a PayNow attempt for the tender at `index`.
    ///
    /// The amount is the tender's own amount if positive, otherwise the
    /// balance left after every other tender.
    pub fn begin_paynow(&mut self, index: usize) -> CoreResult<Money> {
        self.ensure_editable("start PayNow")?;
        if self.order.is_none() {
            return Err(CoreError::OrderNotLoaded);
        }
        let tender = *self.tenders.get(index)?;
        if tender.method != PaymentMethod::PayNow {
            return Err(CoreError::WrongMethod {
                index,
                expected: PaymentMethod::PayNow.erp_name().to_string(),
                actual: tender.method.erp_name().to_string(),
            });
        }
        self.ensure_unsettled(index)?;
        if self.paynow.is_in_flight() {
            return Err(self.transition_error("start a second PayNow attempt"));
        }

        let amount = if tender.amount.is_positive() {
            tender.amount
        } else {
            (self.discounted_total() - self.tenders.received_excluding(index)).max(Money::zero())
        };
        if !amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "PayNow amount".to_string(),
            }
            .into());
        }

        self.paynow = PayNowStatus::Requesting { index, amount };
        Ok(amount)
    }

    /// Records the intent created for the current request.
    ///
    /// ## Errors
    /// - `IntentReused` if the id was handed out before; it is never polled twice
    pub fn record_paynow_intent(&mut self, intent_id: impl Into<String>) -> CoreResult<()> {
        let intent_id = intent_id.into();
        let (index, amount) = match &self.paynow {
            PayNowStatus::Requesting { index, amount } => (*index, *amount),
            _ => return Err(self.transition_error("record PayNow intent")),
        };
        if self.spent_intents.iter().any(|id| *id == intent_id) {
            self.paynow = PayNowStatus::Failed {
                index,
                message: format!("PayNow intent {intent_id} was already used"),
            };
            return Err(CoreError::IntentReused(intent_id));
        }
        self.spent_intents.push(intent_id.clone());
        self.paynow = PayNowStatus::AwaitingScan {
            index,
            amount,
            intent_id,
        };
        Ok(())
    }

    /// Records a settled intent; the tender takes the requested amount.
    pub fn record_paynow_succeeded(&mut self, intent_id: &str) -> CoreResult<()> {
        let (index, amount) = self.awaiting_intent(intent_id, "record PayNow success")?;
        self.tenders.set_amount(index, amount)?;
        self.paynow = PayNowStatus::Succeeded {
            index,
            intent_id: intent_id.to_string(),
        };
        Ok(())
    }

    pub fn record_paynow_timed_out(&mut self, intent_id: &str) -> CoreResult<()> {
        let (index, _) = self.awaiting_intent(intent_id, "record PayNow timeout")?;
        self.paynow = PayNowStatus::TimedOut {
            index,
            intent_id: intent_id.to_string(),
        };
        Ok(())
    }

    /// Records an intent-creation or polling failure.
    pub fn record_paynow_failed(&mut self, message: impl Into<String>) {
        let index = match &self.paynow {
            PayNowStatus::Requesting { index, .. } | PayNowStatus::AwaitingScan { index, .. } => {
                *index
            }
            _ => return,
        };
        self.paynow = PayNowStatus::Failed {
            index,
            message: message.into(),
        };
    }

    /// Drops an in-flight attempt on session teardown.
    pub fn abandon_paynow(&mut self) {
        if self.paynow.is_in_flight() {
            self.paynow = PayNowStatus::Idle;
        }
    }

    /// Returns true if `intent_id` was handed out in this session.
    pub fn intent_spent(&self, intent_id: &str) -> bool {
        self.spent_intents.iter().any(|id| id == intent_id)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn awaiting_intent(&self, intent_id: &str, action: &str) -> CoreResult<(usize, Money)> {
        match &self.paynow {
            PayNowStatus::AwaitingScan {
                index,
                amount,
                intent_id: current,
            } if current == intent_id => Ok((*index, *amount)),
            _ => Err(CoreError::InvalidTransition {
                action: action.to_string(),
                state: format!("PayNow {}", self.paynow.label()),
            }),
        }
    }

    /// Rejects changes to a tender already paid on the terminal or by PayNow.
    fn ensure_unsettled(&self, index: usize) -> CoreResult<()> {
        let captured = matches!(self.card, CardStatus::Captured { index: i, .. } if i == index);
        let paid = matches!(self.paynow, PayNowStatus::Succeeded { index: i, .. } if i == index);
        if captured || paid {
            let method = self
                .tenders
                .get(index)
                .map(|t| t.method.erp_name())
                .unwrap_or_default();
            return Err(CoreError::TenderSettled {
                index,
                method: method.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_editable(&self, action: &str) -> CoreResult<()> {
        if self.phase == CheckoutPhase::Completed {
            return Err(self.transition_error(action));
        }
        if self.journal.has_writes() {
            return Err(CoreError::PlanFrozen {
                order_id: self
                    .order
                    .as_ref()
                    .map(|o| o.id.clone())
                    .unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn transition_error(&self, action: &str) -> CoreError {
        CoreError::InvalidTransition {
            action: action.to_string(),
            state: self.phase.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
