//! # Kopi Configuration
//!
//! Connection settings for the ERP and payment gateways, plus the checkout
//! timing knobs.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KOPI_ERP_URL=https://erp.example.com                               │
//! │     KOPI_ERP_API_KEY / KOPI_ERP_API_SECRET                             │
//! │     KOPI_PAYMENTS_URL / KOPI_PAYMENTS_SECRET                           │
//! │     KOPI_WAREHOUSE=Stores - KOPI                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/kopi-pos/kopi.toml (Linux)                               │
//! │     ~/Library/Application Support/com.kopi.pos/kopi.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost URLs, 2s PayNow poll, 120s PayNow window                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # kopi.toml
//! [erp]
//! base_url = "https://erp.kopi.example"
//! api_key = "abc"
//! api_secret = "def"
//! company = "Kopi Pte Ltd"
//! warehouse = "Stores - KOPI"
//! price_list = "Standard Selling"
//!
//! [payments]
//! base_url = "https://pay.kopi.example"
//! secret = "sk_live_xxx"
//!
//! [checkout]
//! paynow_poll_interval_secs = 2
//! paynow_timeout_secs = 120
//! max_split = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{GatewayError, GatewayResult};

// =============================================================================
// ERP Settings
// =============================================================================

/// ERP connection and document defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpSettings {
    /// Base URL of the ERP site (without `/api`).
    #[serde(default = "default_erp_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    /// HTTP timeout per request (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub company: String,

    /// Warehouse for stock entries and order lines.
    #[serde(default = "default_warehouse")]
    pub warehouse: String,

    /// Selling price list for new item prices.
    #[serde(default = "default_price_list")]
    pub price_list: String,

    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_erp_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_warehouse() -> String {
    "Stores".to_string()
}

fn default_price_list() -> String {
    "Standard Selling".to_string()
}

fn default_currency() -> String {
    "SGD".to_string()
}

impl Default for ErpSettings {
    fn default() -> Self {
        ErpSettings {
            base_url: default_erp_url(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_secs: default_timeout(),
            company: String::new(),
            warehouse: default_warehouse(),
            price_list: default_price_list(),
            currency: default_currency(),
        }
    }
}

impl ErpSettings {
    /// Value for the ERP `Authorization` header.
    pub fn auth_header(&self) -> String {
        format!("token {}:{}", self.api_key, self.api_secret)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Payment Settings
// =============================================================================

/// Payment gateway connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    #[serde(default = "default_payments_url")]
    pub base_url: String,

    /// Bearer secret.
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_payments_url() -> String {
    "http://localhost:4242".to_string()
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            base_url: default_payments_url(),
            secret: String::new(),
            currency: default_currency(),
            timeout_secs: default_timeout(),
        }
    }
}

impl PaymentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

/// Checkout timing and split limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// PayNow status poll interval (seconds).
    #[serde(default = "default_poll_interval")]
    pub paynow_poll_interval_secs: u64,

    /// PayNow window before the attempt is marked timed out (seconds).
    #[serde(default = "default_paynow_timeout")]
    pub paynow_timeout_secs: u64,

    /// Maximum tenders per checkout.
    #[serde(default = "default_max_split")]
    pub max_split: usize,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_paynow_timeout() -> u64 {
    120
}

fn default_max_split() -> usize {
    kopi_core::MAX_SPLIT_TENDERS
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            paynow_poll_interval_secs: default_poll_interval(),
            paynow_timeout_secs: default_paynow_timeout(),
            max_split: default_max_split(),
        }
    }
}

impl CheckoutSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.paynow_poll_interval_secs)
    }

    pub fn paynow_timeout(&self) -> Duration {
        Duration::from_secs(self.paynow_timeout_secs)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Kopi configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KopiConfig {
    #[serde(default)]
    pub erp: ErpSettings,

    #[serde(default)]
    pub payments: PaymentSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl KopiConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kopi.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> GatewayResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> GatewayResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| GatewayError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GatewayResult<()> {
        validate_http_url("erp.base_url", &self.erp.base_url)?;
        validate_http_url("payments.base_url", &self.payments.base_url)?;

        if self.erp.timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "erp.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.payments.timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "payments.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.checkout.paynow_poll_interval_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "paynow_poll_interval_secs must be greater than 0".into(),
            ));
        }

        if self.checkout.paynow_timeout_secs < self.checkout.paynow_poll_interval_secs {
            return Err(GatewayError::InvalidConfig(
                "paynow_timeout_secs must be at least the poll interval".into(),
            ));
        }

        if self.checkout.max_split == 0 || self.checkout.max_split > kopi_core::MAX_SPLIT_TENDERS {
            return Err(GatewayError::InvalidConfig(format!(
                "max_split must be between 1 and {}",
                kopi_core::MAX_SPLIT_TENDERS
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("KOPI_ERP_URL") {
            debug!(url = %url, "Overriding ERP URL from environment");
            self.erp.base_url = url;
        }

        if let Some(key) = lookup("KOPI_ERP_API_KEY") {
            self.erp.api_key = key;
        }

        if let Some(secret) = lookup("KOPI_ERP_API_SECRET") {
            self.erp.api_secret = secret;
        }

        if let Some(url) = lookup("KOPI_PAYMENTS_URL") {
            debug!(url = %url, "Overriding payments URL from environment");
            self.payments.base_url = url;
        }

        if let Some(secret) = lookup("KOPI_PAYMENTS_SECRET") {
            self.payments.secret = secret;
        }

        if let Some(warehouse) = lookup("KOPI_WAREHOUSE") {
            self.erp.warehouse = warehouse;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "kopi", "pos")
            .map(|dirs| dirs.config_dir().join("kopi.toml"))
    }
}

fn validate_http_url(field: &str, raw: &str) -> GatewayResult<()> {
    let url = Url::parse(raw).map_err(|e| GatewayError::InvalidUrl(format!("{field}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(GatewayError::InvalidUrl(format!(
            "{field} must start with http:// or https://, got scheme '{other}'"
        ))),
    }
}
