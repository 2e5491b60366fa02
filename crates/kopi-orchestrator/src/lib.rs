//! # kopi-orchestrator: Checkout and Inventory Workflows
//!
//! Sequences calls to the ERP and the payment gateway.
//!
//! ## Module Organization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         kopi-orchestrator                               │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   checkout      │   │    paynow       │   │   inventory     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  session        │──►│  poll_intent    │   │  template saga  │       │
//! │  │  card capture   │   │  2s / 120s      │   │  variant fan-out│       │
//! │  │  completion     │   │  cancellation   │   │  stock entry    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │    orders       │   │    events       │                              │
//! │  │  open tickets   │   │  progress hooks │                              │
//! │  │  item lookups   │   │  for front ends │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Gateways are injected as `Arc<dyn ErpGateway>` / `Arc<dyn PaymentGateway>`
//! so tests run against in-memory fakes.

pub mod checkout;
pub mod error;
pub mod events;
pub mod inventory;
pub mod orders;
pub mod paynow;

#[cfg(test)]
mod testing;

pub use checkout::{card_label, phase_label, CardOutcome, CheckoutSession, CheckoutSummary};
pub use error::{CheckoutError, CheckoutResult};
pub use events::{CheckoutEvents, NoOpEvents};
pub use inventory::{create_item_with_variants, InventoryReport};
pub use orders::{create_order, fetch_item_details, open_orders};
pub use paynow::{poll_intent, PollOutcome, PollSettings};
