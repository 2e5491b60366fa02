//! # Gateway Error Types
//!
//! Error types for ERP and payment gateway calls.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Gateway Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Remote              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  Erp { status, msg }    │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Payment { status, msg }│ │
//! │  │  ConfigLoad/Save│  │                 │  │  Unauthorized           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │    Decoding     │   Every variant renders ONE human-readable line.   │
//! │  │                 │   Remote variants carry the gateway's own message. │
//! │  │  InvalidResponse│                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is retried. The categorisation helpers exist for logging.

use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error type covering every ERP / payment failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid gateway configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A base URL did not parse or is not http(s).
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the remote host.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The request exceeded the client timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// The ERP answered with a non-2xx status.
    #[error("{message}")]
    Erp { status: u16, message: String },

    /// The payment gateway answered with a non-2xx status.
    #[error("{message}")]
    Payment { status: u16, message: String },

    /// Credentials rejected (401/403).
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    // =========================================================================
    // Decoding Errors
    // =========================================================================
    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            GatewayError::InvalidConfig(err.to_string())
        } else {
            GatewayError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::InvalidResponse(err.to_string())
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        GatewayError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        GatewayError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for GatewayError {
    fn from(err: toml::ser::Error) -> Self {
        GatewayError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for logging)
// =============================================================================

impl GatewayError {
    /// Returns true if the failure was transient (network, timeout, 5xx).
    ///
    /// Checkout never retries on its own; the flag only tells the operator
    /// whether pressing "complete" again is likely to help.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::ConnectionFailed(_) | GatewayError::Timeout(_) => true,
            GatewayError::Erp { status, .. } | GatewayError::Payment { status, .. } => {
                *status >= 500
            }
            _ => false,
        }
    }

    /// HTTP status of a remote error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Erp { status, .. } | GatewayError::Payment { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(GatewayError::ConnectionFailed("refused".into()).is_retryable());
        assert!(GatewayError::Timeout("30s".into()).is_retryable());
        assert!(GatewayError::Erp {
            status: 502,
            message: "Bad Gateway".into()
        }
        .is_retryable());

        assert!(!GatewayError::Erp {
            status: 417,
            message: "Mandatory field".into()
        }
        .is_retryable());
        assert!(!GatewayError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_remote_error_displays_gateway_message() {
        let err = GatewayError::Erp {
            status: 417,
            message: "Customer Walk-in is disabled".into(),
        };
        assert_eq!(err.to_string(), "Customer Walk-in is disabled");
        assert_eq!(err.status(), Some(417));
    }
}
