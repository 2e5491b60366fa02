//! # Orchestrator Error Types
//!
//! What the operator sees when a workflow stops.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rule  ◄── CoreError       rejected before any network call            │
//! │  Step  ◄── GatewayError    a gateway call failed; earlier documents    │
//! │                            stay in the ERP (see the checkout journal)   │
//! │  Gateway ◄── GatewayError  a read failed (load order, list, lookup)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use kopi_core::{CoreError, ValidationError};
use kopi_gateway::GatewayError;

/// Result type alias for orchestrator operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule rejected the request. No ERP document was touched.
    #[error("{0}")]
    Rule(#[from] CoreError),

    /// A read-only gateway call failed.
    #[error("{0}")]
    Gateway(#[from] GatewayError),

    /// A write in a multi-step sequence failed; later steps did not run.
    #[error("Could not {step}: {source}")]
    Step {
        step: String,
        #[source]
        source: GatewayError,
    },
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Rule(err.into())
    }
}

impl CheckoutError {
    pub(crate) fn step(step: impl ToString, source: GatewayError) -> Self {
        CheckoutError::Step {
            step: step.to_string(),
            source,
        }
    }

    /// Returns true if no network call was made.
    pub fn is_rule(&self) -> bool {
        matches!(self, CheckoutError::Rule(_))
    }

    /// Returns true if the gateway failure looked transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::Gateway(err) | CheckoutError::Step { source: err, .. } => {
                err.is_retryable()
            }
            CheckoutError::Rule(_) => false,
        }
    }
}
