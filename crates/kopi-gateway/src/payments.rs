//! # Payment Gateway
//!
//! Card-present capture on the counter terminal and PayNow QR intents.
//!
//! ## Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Card / NETS                                                            │
//! │    POST {pay}/terminal/collect { amount: 3060 }                         │
//! │      ... customer taps card, request blocks ...                         │
//! │    ◄── { status: "succeeded", amount_captured: 3060 }                   │
//! │                                                                         │
//! │  PayNow                                                                 │
//! │    POST {pay}/paynow/intents { amount: 1060 }                           │
//! │    ◄── { id: "pi_123", qr_code: "000201...", hosted_url: "https://..." }│
//! │    GET  {pay}/paynow/intents/pi_123   (every 2s, by the orchestrator)   │
//! │    ◄── { status: "pending" | "succeeded" | "canceled" }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts on this wire are integer minor units. Auth is a Bearer secret.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kopi_core::{Money, PaymentMethod};

use crate::config::PaymentSettings;
use crate::error::GatewayResult;
use crate::http::{build_client, build_terminal_client, read_json, Remote};

// =============================================================================
// Types
// =============================================================================

/// Result of a card-present capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCapture {
    pub succeeded: bool,
    /// Amount actually captured (may differ from the request).
    pub amount: Money,
    pub reference: Option<String>,
    /// Decline or terminal message when not succeeded.
    pub message: Option<String>,
}

/// A freshly created PayNow intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayNowIntent {
    pub id: String,
    /// EMVCo QR payload to render.
    pub qr_payload: Option<String>,
    pub hosted_url: Option<String>,
}

/// Polled status of a PayNow intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    /// Not yet paid; keep polling.
    Pending,
    Succeeded,
    /// Cancelled or failed on the gateway side; polling stops.
    Canceled,
}

impl IntentStatus {
    /// Maps the gateway's status string. Anything unrecognised is pending.
    pub fn from_wire(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "succeeded" | "paid" => IntentStatus::Succeeded,
            "canceled" | "cancelled" | "failed" | "expired" => IntentStatus::Canceled,
            _ => IntentStatus::Pending,
        }
    }
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Blocks until the terminal reports an outcome.
    async fn collect_card_payment(
        &self,
        method: PaymentMethod,
        amount: Money,
        reference: &str,
    ) -> GatewayResult<CardCapture>;

    async fn create_paynow_intent(&self, amount: Money, reference: &str)
        -> GatewayResult<PayNowIntent>;

    async fn paynow_status(&self, intent_id: &str) -> GatewayResult<IntentStatus>;
}

// =============================================================================
// Wire Format
// =============================================================================

#[derive(Debug, Serialize)]
struct CollectBody<'a> {
    amount: i64,
    currency: &'a str,
    method: &'static str,
    reference: &'a str,
}

#[derive(Debug, Deserialize)]
struct CollectResponse {
    status: String,
    #[serde(default)]
    amount_captured: Option<i64>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct IntentBody<'a> {
    amount: i64,
    currency: &'a str,
    reference: &'a str,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    hosted_url: Option<String>,
}

/// Error body: `{"error": {"message": …}}` or `{"message": …}`.
fn payment_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

// =============================================================================
// REST Client
// =============================================================================

/// reqwest-backed payment gateway client.
///
/// PayNow calls use the configured timeout. Terminal captures have none.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    client: Client,
    terminal: Client,
    settings: PaymentSettings,
    base_url: String,
}

impl PaymentClient {
    pub fn new(settings: PaymentSettings) -> GatewayResult<Self> {
        let client = build_client(settings.timeout())?;
        let terminal = build_terminal_client(settings.timeout())?;
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        Ok(PaymentClient {
            client,
            terminal,
            settings,
            base_url,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.settings.secret)
    }
}

#[async_trait]
impl PaymentGateway for PaymentClient {
    async fn collect_card_payment(
        &self,
        method: PaymentMethod,
        amount: Money,
        reference: &str,
    ) -> GatewayResult<CardCapture> {
        let url = format!("{}/terminal/collect", self.base_url);
        debug!(%url, amount = amount.cents(), %method, "Requesting card capture");
        let body = CollectBody {
            amount: amount.cents(),
            currency: &self.settings.currency,
            method: match method {
                PaymentMethod::Nets => "nets",
                _ => "card",
            },
            reference,
        };
        let response = self
            .terminal
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        let result: CollectResponse =
            read_json(response, Remote::Payment, payment_error_message).await?;

        let succeeded = IntentStatus::from_wire(&result.status) == IntentStatus::Succeeded;
        Ok(CardCapture {
            succeeded,
            amount: Money::from_cents(result.amount_captured.unwrap_or(if succeeded {
                amount.cents()
            } else {
                0
            })),
            reference: result.id,
            message: result.message,
        })
    }

    async fn create_paynow_intent(
        &self,
        amount: Money,
        reference: &str,
    ) -> GatewayResult<PayNowIntent> {
        let url = format!("{}/paynow/intents", self.base_url);
        debug!(%url, amount = amount.cents(), "Creating PayNow intent");
        let body = IntentBody {
            amount: amount.cents(),
            currency: &self.settings.currency,
            reference,
        };
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        let intent: IntentResponse =
            read_json(response, Remote::Payment, payment_error_message).await?;

        Ok(PayNowIntent {
            id: intent.id,
            qr_payload: intent.qr_code,
            hosted_url: intent.hosted_url,
        })
    }

    async fn paynow_status(&self, intent_id: &str) -> GatewayResult<IntentStatus> {
        let url = format!("{}/paynow/intents/{}", self.base_url, intent_id);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .send()
            .await?;
        let intent: IntentResponse =
            read_json(response, Remote::Payment, payment_error_message).await?;
        Ok(IntentStatus::from_wire(intent.status.as_deref().unwrap_or("")))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
