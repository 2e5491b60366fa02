//! # Kopi POS Command Line
//!
//! Operator entry point for checkout and inventory workflows.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kopi ──► KopiConfig (defaults → kopi.toml → KOPI_* env)                │
//! │    │                                                                    │
//! │    ├── ErpClient      (token auth)                                      │
//! │    ├── PaymentClient  (bearer auth)                                     │
//! │    │                                                                    │
//! │    └── kopi-orchestrator workflows                                      │
//! │          open-orders · checkout · create-item · item-details            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kopi_core::{
    CardStatus, CheckoutPhase, Money, NewItemSpec, PayNowStatus, PaymentMethod, Tender,
};
use kopi_gateway::{ErpClient, ErpGateway, KopiConfig, PayNowIntent, PaymentClient, PaymentGateway};
use kopi_orchestrator::{
    card_label, create_item_with_variants, fetch_item_details, open_orders, phase_label,
    CardOutcome, CheckoutEvents, CheckoutSession, CheckoutSummary,
};

// =============================================================================
// Arguments
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "kopi", version, about = "Kopi POS checkout and inventory operations")]
struct Cli {
    /// Path to kopi.toml (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tickets that have not been checked out
    OpenOrders,

    /// Check out an order
    Checkout(CheckoutArgs),

    /// Create a template item with variants from a JSON file
    CreateItem {
        /// JSON file holding the template and its variants (prices in cents)
        #[arg(long, value_name = "FILE")]
        spec: PathBuf,
    },

    /// Look up several items at once
    ItemDetails {
        #[arg(required = true)]
        item_codes: Vec<String>,
    },

    /// Write the default configuration file
    InitConfig,
}

#[derive(Args, Debug)]
struct CheckoutArgs {
    /// Sales Order name
    order_id: String,

    /// Discount percentage (0-100)
    #[arg(long)]
    discount: Option<f64>,

    /// Tender as METHOD[:AMOUNT], e.g. cash:20 or paynow (repeat to split)
    #[arg(long = "tender", required = true, value_parser = parse_tender)]
    tenders: Vec<Tender>,
}

fn parse_tender(raw: &str) -> Result<Tender, String> {
    let (method, amount) = match raw.split_once(':') {
        Some((method, amount)) => (method, Some(amount)),
        None => (raw, None),
    };
    let method: PaymentMethod = method.parse().map_err(|e| format!("{e}"))?;
    let amount = match amount {
        Some(amount) => {
            let value: f64 = amount
                .trim()
                .parse()
                .map_err(|_| format!("'{amount}' is not an amount"))?;
            if !value.is_finite() || value < 0.0 {
                return Err(format!("'{amount}' must be a non-negative amount"));
            }
            Money::from_major_units(value)
        }
        None => Money::zero(),
    };
    Ok(Tender::new(method, amount))
}

// =============================================================================
// Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Command::InitConfig = cli.command {
        KopiConfig::default()
            .save(cli.config)
            .context("Could not write config")?;
        println!("Default configuration written");
        return Ok(());
    }

    let config = KopiConfig::load(cli.config).context("Could not load config")?;
    let erp: Arc<dyn ErpGateway> = Arc::new(ErpClient::new(config.erp.clone())?);

    match cli.command {
        Command::OpenOrders => {
            let orders = open_orders(erp.as_ref()).await?;
            if orders.is_empty() {
                println!("No open tickets");
            }
            for order in orders {
                println!(
                    "{:<24} {:<20} {:>10}  {}",
                    order.id,
                    order.customer,
                    order.grand_total.to_string(),
                    order.transaction_date.unwrap_or_default()
                );
            }
        }
        Command::Checkout(args) => {
            let payments: Arc<dyn PaymentGateway> =
                Arc::new(PaymentClient::new(config.payments.clone())?);
            let summary = checkout(erp, payments, &config, args).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::CreateItem { spec } => {
            let raw = std::fs::read_to_string(&spec)
                .with_context(|| format!("Could not read {}", spec.display()))?;
            let spec: NewItemSpec = serde_json::from_str(&raw)
                .with_context(|| format!("Could not parse {}", spec.display()))?;
            let report = create_item_with_variants(erp.as_ref(), &spec).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::ItemDetails { item_codes } => {
            for item in fetch_item_details(erp.as_ref(), &item_codes).await? {
                let rate = item.standard_rate.unwrap_or_default();
                println!("{:<20} {:<30} {:>8}", item.item_code, item.item_name, rate.to_string());
            }
        }
        Command::InitConfig => {}
    }

    Ok(())
}

/// Logs go to stderr, filtered by `KOPI_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("KOPI_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// Checkout
// =============================================================================

async fn checkout(
    erp: Arc<dyn ErpGateway>,
    payments: Arc<dyn PaymentGateway>,
    config: &KopiConfig,
    args: CheckoutArgs,
) -> Result<CheckoutSummary> {
    let mut session =
        CheckoutSession::new(erp, payments, &config.checkout).with_events(Arc::new(ConsoleEvents));

    let order = session.load(&args.order_id).await?;
    info!(order_id = %order.id, customer = %order.customer, "Checking out");

    if let Some(pct) = args.discount {
        session.enable_discount(true)?;
        session.set_discount_percentage(pct)?;
    }
    if args.tenders.len() > 1 {
        session.set_split(true)?;
    }
    for (index, tender) in args.tenders.iter().enumerate() {
        session.set_tender_method(index, tender.method)?;
        session.set_tender_amount(index, tender.amount)?;
    }
    println!("Amount due: {}", session.state().discounted_total());

    let teardown = session.teardown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            teardown.cancel();
        }
    });

    for (index, tender) in args.tenders.iter().enumerate() {
        if tender.method.is_async() {
            match session.pay_with_paynow(index).await? {
                PayNowStatus::Succeeded { .. } => {}
                status => bail!("PayNow not settled ({})", status.label()),
            }
        } else if tender.method.is_card_present() {
            match session.capture_card(index).await? {
                CardOutcome::Completed(summary) => return Ok(summary),
                CardOutcome::NotCaptured { message } => bail!("Card not captured: {message}"),
            }
        }
    }

    Ok(session.complete().await?)
}

/// Prints checkout progress for the cashier.
struct ConsoleEvents;

impl CheckoutEvents for ConsoleEvents {
    fn phase_changed(&self, order_id: &str, phase: &CheckoutPhase) {
        if let CheckoutPhase::Failed { .. } = phase {
            warn!(order_id, "Checkout failed");
        }
        println!("[{order_id}] {}", phase_label(phase));
    }

    fn card_status(&self, status: &CardStatus) {
        println!("Card: {}", card_label(status));
    }

    fn paynow_intent(&self, intent: &PayNowIntent) {
        if let Some(qr) = &intent.qr_payload {
            println!("PayNow QR payload: {qr}");
        }
        if let Some(url) = &intent.hosted_url {
            println!("PayNow page: {url}");
        }
    }

    fn paynow_status(&self, status: &PayNowStatus) {
        println!("PayNow: {}", status.label());
    }

    fn receipt_prompt(&self, summary: &CheckoutSummary) {
        println!(
            "Invoice {} paid. Change {}. Send receipt?",
            summary.invoice, summary.change
        );
    }
}
