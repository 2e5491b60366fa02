//! # PayNow Poller
//!
//! Polls one PayNow intent until it settles, the window closes, or the
//! session is torn down.
//!
//! ## Timeline
//! ```text
//! t=0      intent created
//! t=2s     poll #1 ── pending
//! t=4s     poll #2 ── pending
//!  ...
//! t=118s   poll #59 ── pending
//! t=120s   window closes ──► TimedOut   (no poll at or after 120s)
//!
//! At any point: status "succeeded" ──► Succeeded
//!               status "canceled"  ──► Canceled
//!               token cancelled    ──► Aborted
//! ```
//!
//! The deadline is checked before the tick, and an in-flight status request
//! is raced against both the deadline and the cancellation token.

use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kopi_gateway::{CheckoutSettings, GatewayResult, IntentStatus, PaymentGateway};

/// How a polling cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded,
    /// The window closed without a success.
    TimedOut,
    /// The gateway cancelled or failed the intent.
    Canceled,
    /// The session was torn down.
    Aborted,
}

/// Poll interval and window.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&CheckoutSettings> for PollSettings {
    fn from(settings: &CheckoutSettings) -> Self {
        PollSettings {
            interval: settings.poll_interval(),
            timeout: settings.paynow_timeout(),
        }
    }
}

/// Polls `intent_id` until it resolves.
///
/// ## Errors
/// A failed status request ends the cycle with that error.
pub async fn poll_intent(
    gateway: &dyn PaymentGateway,
    intent_id: &str,
    settings: PollSettings,
    cancel: CancellationToken,
) -> GatewayResult<PollOutcome> {
    let start = Instant::now();
    let deadline = sleep_until(start + settings.timeout);
    tokio::pin!(deadline);

    let mut ticker = interval_at(start + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls: u32 = 0;

    info!(intent_id, timeout_secs = settings.timeout.as_secs(), "Polling PayNow intent");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(intent_id, polls, "PayNow polling aborted");
                return Ok(PollOutcome::Aborted);
            }

            _ = &mut deadline => {
                warn!(intent_id, polls, "PayNow window closed");
                return Ok(PollOutcome::TimedOut);
            }

            _ = ticker.tick() => {
                polls += 1;
                let status = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(PollOutcome::Aborted),
                    _ = &mut deadline => {
                        warn!(intent_id, polls, "PayNow window closed during poll");
                        return Ok(PollOutcome::TimedOut);
                    }
                    status = gateway.paynow_status(intent_id) => status?,
                };

                match status {
                    IntentStatus::Succeeded => {
                        info!(intent_id, polls, "PayNow payment received");
                        return Ok(PollOutcome::Succeeded);
                    }
                    IntentStatus::Canceled => {
                        warn!(intent_id, polls, "PayNow intent cancelled by gateway");
                        return Ok(PollOutcome::Canceled);
                    }
                    IntentStatus::Pending => {
                        debug!(intent_id, polls, "PayNow still pending");
                    }
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePayments;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_success_within_window() {
        let payments = FakePayments::succeeding_after(50);
        let start = Instant::now();

        let outcome = poll_intent(
            &payments,
            "pi_1",
            PollSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Succeeded);
        assert_eq!(payments.polls(), 51);
        assert_eq!(start.elapsed(), Duration::from_secs(102));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_exactly_120s() {
        let payments = FakePayments::never_succeeding();
        let start = Instant::now();

        let outcome = poll_intent(
            &payments,
            "pi_1",
            PollSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_secs(120));
        assert_eq!(payments.polls(), 59);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(payments.polls(), 59);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_reported_at_deadline_is_timeout() {
        // Poll #60 would land at t=120s, the same instant the window closes.
        let payments = FakePayments::succeeding_after(59);

        let outcome = poll_intent(
            &payments,
            "pi_1",
            PollSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(payments.polls(), 59);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_polling() {
        let payments = Arc::new(FakePayments::never_succeeding());
        let cancel = CancellationToken::new();

        let task = {
            let payments = Arc::clone(&payments);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                poll_intent(&*payments, "pi_1", PollSettings::default(), cancel).await
            })
        };

        tokio::time::sleep(Duration::from_secs(7)).await;
        cancel.cancel();
        let outcome = task.await.unwrap().unwrap();

        assert_eq!(outcome, PollOutcome::Aborted);
        assert_eq!(payments.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_cancel_ends_cycle() {
        let payments = FakePayments::canceled_after(2);

        let outcome = poll_intent(
            &payments,
            "pi_1",
            PollSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Canceled);
        assert_eq!(payments.polls(), 3);
    }
}
