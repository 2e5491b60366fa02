//! Shared reqwest plumbing for both gateways.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// Longest slice of a raw error body kept in a message.
const MAX_RAW_MESSAGE: usize = 300;

/// Builds a client with the given per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> GatewayResult<Client> {
    Ok(Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?)
}

/// Builds a client for card-present captures.
///
/// Only connecting is bounded. Once the terminal has the request, the
/// client waits for its answer however long the cardholder takes.
pub(crate) fn build_terminal_client(connect_timeout: Duration) -> GatewayResult<Client> {
    Ok(Client::builder().connect_timeout(connect_timeout).build()?)
}

/// Which gateway produced a response; decides the error variant.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Remote {
    Erp,
    Payment,
}

/// Decodes a 2xx JSON body, or maps a non-2xx into a [`GatewayError`]
/// using `extract` to pull the human-readable message out of the body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    remote: Remote,
    extract: fn(&str) -> Option<String>,
) -> GatewayResult<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = extract(&text).unwrap_or_else(|| fallback_message(status, &text));
        debug!(status = status.as_u16(), %message, "Gateway returned an error");
        return Err(match (status, remote) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
                GatewayError::Unauthorized(message)
            }
            (_, Remote::Erp) => GatewayError::Erp {
                status: status.as_u16(),
                message,
            },
            (_, Remote::Payment) => GatewayError::Payment {
                status: status.as_u16(),
                message,
            },
        });
    }

    Ok(serde_json::from_str(&text)?)
}

fn fallback_message(status: StatusCode, text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return format!("HTTP {status}");
    }
    trimmed.chars().take(MAX_RAW_MESSAGE).collect()
}
