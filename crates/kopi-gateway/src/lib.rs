//! # kopi-gateway: ERP and Payment Gateway Clients
//!
//! Every network call Kopi makes goes through this crate.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Gateway Architecture                             │
//! │                                                                         │
//! │  kopi-orchestrator                                                     │
//! │     │ Arc<dyn ErpGateway>            Arc<dyn PaymentGateway>            │
//! │     ▼                                     ▼                             │
//! │  ┌──────────────────────────┐   ┌──────────────────────────────────┐   │
//! │  │  ErpClient               │   │  PaymentClient                   │   │
//! │  │  token key:secret        │   │  Bearer secret                   │   │
//! │  │  {"data": …} envelopes   │   │  amounts in minor units          │   │
//! │  │  decimal amounts         │   │                                  │   │
//! │  └────────────┬─────────────┘   └────────────────┬─────────────────┘   │
//! │               ▼                                  ▼                      │
//! │        ERPNext REST API                 Terminal / PayNow API          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - `KopiConfig` (TOML + environment)
//! - [`erp`] - `ErpGateway` trait and REST client
//! - [`payments`] - `PaymentGateway` trait and REST client
//! - [`wire`] - ERP document shapes
//! - [`error`] - Gateway error types

pub mod config;
pub mod erp;
pub mod error;
mod http;
pub mod payments;
pub mod wire;

pub use config::{CheckoutSettings, ErpSettings, KopiConfig, PaymentSettings};
pub use erp::{
    ErpClient, ErpGateway, InvoiceRequest, ItemDetail, NewItem, NewSalesOrder, OrderSummary,
    PaymentEntryRequest, StockLine,
};
pub use error::{GatewayError, GatewayResult};
pub use payments::{CardCapture, IntentStatus, PayNowIntent, PaymentClient, PaymentGateway};
