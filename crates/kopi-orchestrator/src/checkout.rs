//! # Checkout Session
//!
//! Drives one order from "loaded" to "paid" against the ERP and the
//! payment gateway.
//!
//! ## Completion Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  complete()                                                             │
//! │     │                                                                   │
//! │     ├── prepare_completion()   validate + freeze plan (no I/O)          │
//! │     │        │ Underpaid / OrderNotLoaded ──► Err, ERP untouched        │
//! │     ▼                                                                   │
//! │  (a) PUT  Sales Order     discount %, "Cash,PayNow", ticket completed   │
//! │  (b) POST Sales Invoice   same lines, discount %, docstatus=1           │
//! │  (c) POST Payment Entry   one per allocation, in tender order           │
//! │  (d) PUT  Sales Order     payment completed                             │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  Completed + receipt prompt                                             │
//! │                                                                         │
//! │  Any step fails ──► Failed { message }. The journal remembers what      │
//! │  was written; calling complete() again resumes at the failed step.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use kopi_core::{
    AllocationPlan, CardStatus, CheckoutPhase, CheckoutState, CompletionPlan, CompletionStep,
    CoreError, DiscountRate, Money, Order, PayNowStatus, PaymentMethod, TenderList,
};
use kopi_gateway::{
    CheckoutSettings, ErpGateway, InvoiceRequest, PaymentEntryRequest, PaymentGateway,
};

use crate::error::{CheckoutError, CheckoutResult};
use crate::events::{CheckoutEvents, NoOpEvents};
use crate::paynow::{poll_intent, PollOutcome, PollSettings};

// =============================================================================
// Outcomes
// =============================================================================

/// What a completed checkout produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSummary {
    pub order_id: String,
    pub invoice: String,
    pub payment_entries: Vec<String>,
    pub total_due: Money,
    pub change: Money,
    pub allocations: AllocationPlan,
    /// Ask the cashier whether to send a receipt.
    pub send_receipt_prompt: bool,
}

/// Result of a card capture.
#[derive(Debug, Clone, PartialEq)]
pub enum CardOutcome {
    /// Captured, and the checkout then completed.
    Completed(CheckoutSummary),
    /// Terminal declined or was unreachable; the session stays open.
    NotCaptured { message: String },
}

// =============================================================================
// Checkout Session
// =============================================================================

/// One cashier's checkout of one order.
pub struct CheckoutSession {
    erp: Arc<dyn ErpGateway>,
    payments: Arc<dyn PaymentGateway>,
    poll: PollSettings,
    state: CheckoutState,
    events: Arc<dyn CheckoutEvents>,
    teardown: CancellationToken,
}

impl CheckoutSession {
    pub fn new(
        erp: Arc<dyn ErpGateway>,
        payments: Arc<dyn PaymentGateway>,
        settings: &CheckoutSettings,
    ) -> Self {
        CheckoutSession {
            erp,
            payments,
            poll: PollSettings::from(settings),
            state: CheckoutState::new(TenderList::new(settings.max_split)),
            events: Arc::new(NoOpEvents),
            teardown: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn CheckoutEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Token that stops any PayNow polling when cancelled.
    pub fn teardown_token(&self) -> CancellationToken {
        self.teardown.clone()
    }

    /// Stops polling and drops any in-flight PayNow attempt.
    pub fn teardown(&mut self) {
        self.teardown.cancel();
        self.state.abandon_paynow();
    }

    // -------------------------------------------------------------------------
    // Order, discount, tenders
    // -------------------------------------------------------------------------

    /// Loads an order from the ERP and resets the session around it.
    pub async fn load(&mut self, order_id: &str) -> CheckoutResult<&Order> {
        let order = self.erp.get_sales_order(order_id).await?;
        info!(
            order_id,
            lines = order.lines.len(),
            net_total = %order.net_total(),
            "Order loaded for checkout"
        );
        self.state.load_order(order)?;
        self.emit_phase();
        self.state.order().ok_or(CheckoutError::Rule(CoreError::OrderNotLoaded))
    }

    pub fn enable_discount(&mut self, enabled: bool) -> CheckoutResult<()> {
        Ok(self.state.enable_discount(enabled)?)
    }

    pub fn set_discount_percentage(&mut self, pct: f64) -> CheckoutResult<DiscountRate> {
        Ok(self.state.set_discount_percentage(pct)?)
    }

    pub fn set_split(&mut self, split: bool) -> CheckoutResult<()> {
        Ok(self.state.set_split(split)?)
    }

    pub fn set_tender_method(&mut self, index: usize, method: PaymentMethod) -> CheckoutResult<()> {
        Ok(self.state.set_tender_method(index, method)?)
    }

    pub fn set_tender_amount(&mut self, index: usize, amount: Money) -> CheckoutResult<()> {
        Ok(self.state.set_tender_amount(index, amount)?)
    }

    // -------------------------------------------------------------------------
    // Card terminal
    // -------------------------------------------------------------------------

    /// Captures the discounted total on the terminal for tender `index`,
    /// then completes the checkout.
    ///
    /// A decline or an unreachable terminal is an outcome, not an error.
    pub async fn capture_card(&mut self, index: usize) -> CheckoutResult<CardOutcome> {
        let amount = self.state.begin_card_capture(index)?;
        let method = self.state.tenders().get(index)?.method;
        let reference = self.reference();
        self.events.card_status(self.state.card_status());
        info!(order_id = %reference, %amount, %method, "Awaiting card-present payment");

        let capture = self
            .payments
            .collect_card_payment(method, amount, &reference)
            .await;
        let message = match capture {
            Ok(capture) if capture.succeeded => {
                self.state.record_card_captured(index, capture.amount)?;
                self.events.card_status(self.state.card_status());
                info!(order_id = %reference, captured = %capture.amount, "Card captured");
                return Ok(CardOutcome::Completed(self.complete().await?));
            }
            Ok(capture) => capture
                .message
                .unwrap_or_else(|| "Card payment was not approved".to_string()),
            Err(err) => err.to_string(),
        };

        warn!(order_id = %reference, %message, "Card capture failed");
        self.state.record_card_failed(index, message.clone());
        self.events.card_status(self.state.card_status());
        Ok(CardOutcome::NotCaptured { message })
    }

    // -------------------------------------------------------------------------
    // PayNow
    // -------------------------------------------------------------------------

    /// Creates a PayNow intent for tender `index` and polls it.
    ///
    /// Returns the resulting status. Timeouts, gateway cancellation and
    /// gateway errors end as status values; the session stays open.
    pub async fn pay_with_paynow(&mut self, index: usize) -> CheckoutResult<PayNowStatus> {
        let amount = self.state.begin_paynow(index)?;
        let reference = self.reference();
        self.events.paynow_status(self.state.paynow_status());

        let intent = match self.payments.create_paynow_intent(amount, &reference).await {
            Ok(intent) => intent,
            Err(err) => {
                warn!(order_id = %reference, error = %err, "PayNow intent creation failed");
                self.state.record_paynow_failed(err.to_string());
                self.events.paynow_status(self.state.paynow_status());
                return Ok(self.state.paynow_status().clone());
            }
        };

        self.state.record_paynow_intent(intent.id.clone())?;
        self.events.paynow_intent(&intent);
        self.events.paynow_status(self.state.paynow_status());
        info!(order_id = %reference, intent_id = %intent.id, %amount, "PayNow QR issued");

        let outcome = poll_intent(
            self.payments.as_ref(),
            &intent.id,
            self.poll,
            self.teardown.child_token(),
        )
        .await;

        match outcome {
            Ok(PollOutcome::Succeeded) => self.state.record_paynow_succeeded(&intent.id)?,
            Ok(PollOutcome::TimedOut) => self.state.record_paynow_timed_out(&intent.id)?,
            Ok(PollOutcome::Canceled) => self
                .state
                .record_paynow_failed("PayNow payment was cancelled"),
            Ok(PollOutcome::Aborted) => self.state.abandon_paynow(),
            Err(err) => {
                warn!(intent_id = %intent.id, error = %err, "PayNow polling failed");
                self.state.record_paynow_failed(err.to_string());
            }
        }

        self.events.paynow_status(self.state.paynow_status());
        Ok(self.state.paynow_status().clone())
    }

    // -------------------------------------------------------------------------
    // Completion
    // -------------------------------------------------------------------------

    /// Runs (or resumes) the completion sequence.
    pub async fn complete(&mut self) -> CheckoutResult<CheckoutSummary> {
        let plan = self.state.prepare_completion()?;
        self.emit_phase();
        info!(
            order_id = %plan.order_id,
            attempt_id = %plan.attempt_id,
            total_due = %plan.total_due,
            tenders = plan.allocations.entries.len(),
            "Completing checkout"
        );

        while let Some(step) = self.state.next_step() {
            if let Err(err) = self.run_step(step, &plan).await {
                let message = err.to_string();
                error!(
                    order_id = %plan.order_id,
                    attempt_id = %plan.attempt_id,
                    %step,
                    error = %message,
                    retryable = err.is_retryable(),
                    "Checkout aborted"
                );
                self.state.mark_failed(message);
                self.emit_phase();
                return Err(err);
            }
        }

        self.state.mark_completed()?;
        self.emit_phase();

        let journal = self.state.journal();
        let summary = CheckoutSummary {
            order_id: plan.order_id.clone(),
            invoice: journal.invoice.clone().unwrap_or_default(),
            payment_entries: journal.payment_entries.clone(),
            total_due: plan.total_due,
            change: plan.change,
            allocations: plan.allocations.clone(),
            send_receipt_prompt: true,
        };
        info!(
            order_id = %summary.order_id,
            invoice = %summary.invoice,
            change = %summary.change,
            "Checkout completed"
        );
        self.events.receipt_prompt(&summary);
        Ok(summary)
    }

    async fn run_step(&mut self, step: CompletionStep, plan: &CompletionPlan) -> CheckoutResult<()> {
        match step {
            CompletionStep::FinalizeTicket => {
                self.erp
                    .finalize_ticket(&plan.order_id, plan.discount, &plan.methods_summary)
                    .await
                    .map_err(|e| CheckoutError::step(step, e))?;
                self.state.record_ticket_finalized();
            }
            CompletionStep::CreateInvoice => {
                let request = InvoiceRequest {
                    order_id: plan.order_id.clone(),
                    customer: plan.customer.clone(),
                    lines: plan.lines.clone(),
                    discount: plan.discount,
                };
                let invoice = self
                    .erp
                    .create_invoice(&request)
                    .await
                    .map_err(|e| CheckoutError::step(step, e))?;
                info!(order_id = %plan.order_id, %invoice, "Invoice submitted");
                self.state.record_invoice(invoice);
            }
            CompletionStep::CreatePaymentEntry(index) => {
                let allocation = plan.allocations.entries.get(index).ok_or_else(|| {
                    CoreError::TenderOutOfRange {
                        index,
                        len: plan.allocations.entries.len(),
                    }
                })?;
                let invoice = self.state.journal().invoice.clone().ok_or_else(|| {
                    CoreError::InvalidTransition {
                        action: step.to_string(),
                        state: "without an invoice".to_string(),
                    }
                })?;
                let request = PaymentEntryRequest {
                    invoice,
                    customer: plan.customer.clone(),
                    method: allocation.method,
                    allocated: allocation.allocated,
                    outstanding: allocation.outstanding,
                    total: allocation.total,
                    reference_no: format!("{}-{}", plan.attempt_id, index),
                };
                let entry = self
                    .erp
                    .create_payment_entry(&request)
                    .await
                    .map_err(|e| CheckoutError::step(step, e))?;
                info!(
                    order_id = %plan.order_id,
                    %entry,
                    method = %allocation.method,
                    allocated = %allocation.allocated,
                    "Payment entry submitted"
                );
                self.state.record_payment_entry(entry);
            }
            CompletionStep::MarkOrderPaid => {
                self.erp
                    .mark_order_paid(&plan.order_id)
                    .await
                    .map_err(|e| CheckoutError::step(step, e))?;
                self.state.record_order_paid();
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Payment reference: the order id.
    fn reference(&self) -> String {
        self.state
            .order()
            .map(|o| o.id.clone())
            .unwrap_or_default()
    }

    fn emit_phase(&self) {
        let order_id = self.reference();
        self.events.phase_changed(&order_id, self.state.phase());
    }
}

impl Drop for CheckoutSession {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

impl std::fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("state", &self.state)
            .field("poll", &self.poll)
            .finish()
    }
}

/// Convenience for callers that only need the phase name.
pub fn phase_label(phase: &CheckoutPhase) -> String {
    match phase {
        CheckoutPhase::Failed { message } => format!("failed: {message}"),
        other => other.to_string(),
    }
}

/// Card status for display.
pub fn card_label(status: &CardStatus) -> String {
    match status {
        CardStatus::Idle => "idle".to_string(),
        CardStatus::AwaitingCardPresent { .. } => "waiting for card".to_string(),
        CardStatus::Captured { amount, .. } => format!("captured {amount}"),
        CardStatus::Failed { message, .. } => format!("failed: {message}"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_order, CardScript, ErpCall, FakeErp, FakePayments};

    fn session(erp: &Arc<FakeErp>, payments: &Arc<FakePayments>) -> CheckoutSession {
        CheckoutSession::new(
            erp.clone() as Arc<dyn ErpGateway>,
            payments.clone() as Arc<dyn PaymentGateway>,
            &CheckoutSettings::default(),
        )
    }

    /// $34.00 order: 4 × $8.50.
    fn erp_34() -> Arc<FakeErp> {
        Arc::new(FakeErp::with_order(sample_order(
            "SAL-ORD-0001",
            &[("NASI-LEMAK", 4, Some(850))],
        )))
    }

    #[tokio::test]
    async fn test_split_cash_paynow_end_to_end() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::succeeding_after(0));
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.enable_discount(true).unwrap();
        checkout.set_discount_percentage(10.0).unwrap();
        assert_eq!(checkout.state().discounted_total().cents(), 3060);

        checkout.set_split(true).unwrap();
        checkout.set_tender_amount(0, Money::from_cents(2000)).unwrap();
        checkout.set_tender_method(1, PaymentMethod::PayNow).unwrap();
        checkout.set_tender_amount(1, Money::from_cents(1060)).unwrap();

        let summary = checkout.complete().await.unwrap();

        assert_eq!(
            erp.ops(),
            vec![
                "finalize_ticket",
                "create_invoice",
                "create_payment_entry",
                "create_payment_entry",
                "mark_order_paid"
            ]
        );
        let calls = erp.calls();
        assert_eq!(
            calls[0],
            ErpCall::FinalizeTicket {
                order_id: "SAL-ORD-0001".into(),
                discount: DiscountRate::from_bps(1000),
                methods: "Cash,PayNow".into(),
            }
        );
        assert_eq!(
            calls[1],
            ErpCall::CreateInvoice {
                order_id: "SAL-ORD-0001".into(),
                discount: DiscountRate::from_bps(1000),
            }
        );
        let allocated: Vec<i64> = calls
            .iter()
            .filter_map(|c| match c {
                ErpCall::CreatePaymentEntry { allocated, .. } => Some(allocated.cents()),
                _ => None,
            })
            .collect();
        assert_eq!(allocated, vec![2000, 1060]);

        assert_eq!(summary.total_due.cents(), 3060);
        assert!(summary.change.is_zero());
        assert!(summary.send_receipt_prompt);
        assert_eq!(summary.payment_entries.len(), 2);
        assert_eq!(checkout.state().phase(), &CheckoutPhase::Completed);
        assert!(checkout.state().order().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_underpaid_never_touches_erp() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_tender_amount(0, Money::from_cents(3399)).unwrap();

        let err = checkout.complete().await.unwrap_err();
        assert!(err.is_rule());
        assert!(erp.calls().is_empty());
        assert_eq!(checkout.state().phase(), &CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_overpaid_cash_reports_change_but_persists_allocated() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_tender_amount(0, Money::from_cents(5000)).unwrap();

        let summary = checkout.complete().await.unwrap();
        assert_eq!(summary.change.cents(), 1600);
        assert!(erp.calls().contains(&ErpCall::CreatePaymentEntry {
            invoice: "DOC-0002".into(),
            method: PaymentMethod::Cash,
            allocated: Money::from_cents(3400),
            outstanding: Money::from_cents(3400),
            total: Money::from_cents(3400),
        }));
    }

    #[tokio::test]
    async fn test_failure_aborts_then_retry_resumes() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_split(true).unwrap();
        checkout.set_tender_amount(0, Money::from_cents(2400)).unwrap();
        checkout.set_tender_method(1, PaymentMethod::Cdc).unwrap();
        checkout.set_tender_amount(1, Money::from_cents(1000)).unwrap();

        erp.fail_on("create_payment_entry", 1);
        let err = checkout.complete().await.unwrap_err();
        assert_eq!(err.to_string(), "Could not create payment entry 1: create_payment_entry rejected");
        assert!(matches!(
            checkout.state().phase(),
            CheckoutPhase::Failed { message } if message.contains("rejected")
        ));
        assert!(!erp.ops().contains(&"mark_order_paid"));

        // Plan is frozen.
        assert!(checkout.set_tender_amount(0, Money::from_cents(1)).is_err());

        erp.clear_failure();
        checkout.complete().await.unwrap();
        assert_eq!(
            erp.ops(),
            vec![
                "finalize_ticket",
                "create_invoice",
                "create_payment_entry",
                "create_payment_entry",
                "mark_order_paid"
            ]
        );
    }

    #[tokio::test]
    async fn test_invoice_failure_surfaces_erp_message() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_tender_amount(0, Money::from_cents(3400)).unwrap();
        erp.fail_on("create_invoice", 0);

        let err = checkout.complete().await.unwrap_err();
        assert!(err.to_string().contains("create_invoice rejected"));
        assert_eq!(erp.ops(), vec!["finalize_ticket"]);
    }

    #[tokio::test]
    async fn test_card_capture_auto_completes() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.enable_discount(true).unwrap();
        checkout.set_discount_percentage(10.0).unwrap();
        checkout.set_tender_method(0, PaymentMethod::Card).unwrap();

        let outcome = checkout.capture_card(0).await.unwrap();
        assert_eq!(payments.requested(), vec![Money::from_cents(3060)]);
        match outcome {
            CardOutcome::Completed(summary) => assert_eq!(summary.total_due.cents(), 3060),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(erp.ops().last(), Some(&"mark_order_paid"));
    }

    #[tokio::test]
    async fn test_failed_completion_after_capture_retries_without_recharging() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_tender_method(0, PaymentMethod::Card).unwrap();
        erp.fail_on("finalize_ticket", 0);

        let err = checkout.capture_card(0).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not finalize ticket: finalize_ticket rejected"
        );

        erp.clear_failure();
        let err = checkout.capture_card(0).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rule(CoreError::TenderSettled { index: 0, .. })
        ));
        assert_eq!(payments.requested(), vec![Money::from_cents(3400)]);

        let summary = checkout.complete().await.unwrap();
        assert_eq!(summary.total_due.cents(), 3400);
        assert_eq!(payments.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_card_decline_keeps_session_open() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        payments.set_card(CardScript::Decline("Insufficient funds"));
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_tender_method(0, PaymentMethod::Nets).unwrap();

        let outcome = checkout.capture_card(0).await.unwrap();
        assert_eq!(
            outcome,
            CardOutcome::NotCaptured {
                message: "Insufficient funds".into()
            }
        );
        assert!(erp.calls().is_empty());
        assert_eq!(checkout.state().phase(), &CheckoutPhase::Idle);

        payments.set_card(CardScript::Unreachable);
        let outcome = checkout.capture_card(0).await.unwrap();
        assert!(matches!(outcome, CardOutcome::NotCaptured { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_paynow_success_sets_tender() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::succeeding_after(3));
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_split(true).unwrap();
        checkout.set_tender_amount(0, Money::from_cents(2000)).unwrap();
        checkout.set_tender_method(1, PaymentMethod::PayNow).unwrap();

        let status = checkout.pay_with_paynow(1).await.unwrap();
        assert!(matches!(status, PayNowStatus::Succeeded { .. }));
        assert_eq!(payments.requested(), vec![Money::from_cents(1400)]);
        assert!(checkout.state().change().is_zero());

        checkout.complete().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_paynow_timeout_then_new_intent() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_tender_method(0, PaymentMethod::PayNow).unwrap();

        let first = checkout.pay_with_paynow(0).await.unwrap();
        assert!(matches!(first, PayNowStatus::TimedOut { ref intent_id, .. } if intent_id == "pi_1"));

        let second = checkout.pay_with_paynow(0).await.unwrap();
        assert!(matches!(second, PayNowStatus::TimedOut { ref intent_id, .. } if intent_id == "pi_2"));

        let ids = payments.polled_ids();
        let first_cycle = ids.iter().filter(|id| *id == "pi_1").count();
        assert_eq!(first_cycle, 59);
        assert_eq!(ids.len(), 118);
        assert!(ids[59..].iter().all(|id| id == "pi_2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reused_intent_id_is_never_polled_again() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding().reusing_intent_id("pi_same"));
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_tender_method(0, PaymentMethod::PayNow).unwrap();

        checkout.pay_with_paynow(0).await.unwrap();
        let polls_after_first = payments.polls();

        let err = checkout.pay_with_paynow(0).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Rule(CoreError::IntentReused(_))));
        assert_eq!(payments.polls(), polls_after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_aborts_paynow() {
        let erp = erp_34();
        let payments = Arc::new(FakePayments::never_succeeding());
        let mut checkout = session(&erp, &payments);

        checkout.load("SAL-ORD-0001").await.unwrap();
        checkout.set_tender_method(0, PaymentMethod::PayNow).unwrap();

        let token = checkout.teardown_token();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            token.cancel();
        });

        let status = checkout.pay_with_paynow(0).await.unwrap();
        assert_eq!(status, PayNowStatus::Idle);
        assert_eq!(payments.polls(), 2);
    }
}
