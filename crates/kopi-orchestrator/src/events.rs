//! # Checkout Events
//!
//! Hooks for whatever front end drives a session (the CLI prints them).
//!
//! ```text
//! CheckoutSession ──► CheckoutEvents
//!                       ├── phase_changed   Idle / ReadyToComplete / Completed / Failed
//!                       ├── card_status     terminal capture progress
//!                       ├── paynow_intent   QR payload to display
//!                       ├── paynow_status   scan progress
//!                       └── receipt_prompt  "send receipt?" after completion
//! ```

use kopi_core::{CardStatus, CheckoutPhase, PayNowStatus};
use kopi_gateway::PayNowIntent;

use crate::checkout::CheckoutSummary;

/// Receives checkout progress.
pub trait CheckoutEvents: Send + Sync {
    fn phase_changed(&self, order_id: &str, phase: &CheckoutPhase);

    fn card_status(&self, status: &CardStatus);

    fn paynow_intent(&self, intent: &PayNowIntent);

    fn paynow_status(&self, status: &PayNowStatus);

    fn receipt_prompt(&self, summary: &CheckoutSummary);
}

/// Event sink that drops everything.
pub struct NoOpEvents;

impl CheckoutEvents for NoOpEvents {
    fn phase_changed(&self, _order_id: &str, _phase: &CheckoutPhase) {}
    fn card_status(&self, _status: &CardStatus) {}
    fn paynow_intent(&self, _intent: &PayNowIntent) {}
    fn paynow_status(&self, _status: &PayNowStatus) {}
    fn receipt_prompt(&self, _summary: &CheckoutSummary) {}
}
