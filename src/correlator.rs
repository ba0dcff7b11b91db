//! Protocol correlation: waiting for a frame that satisfies a predicate.
//!
//! Each wait owns its own subscription, so concurrent correlations on one
//! channel are independent: every call sees every payload in delivery
//! order and evaluates only its own predicate. The subscription is dropped
//! on every exit path; the timeout is the only cancellation mechanism.

use std::time::Duration;

use tracing::{debug, trace};

use crate::channel::{ControlChannel, Subscription};
use crate::predicate::FramePredicate;
use crate::types::Frame;
use crate::{Result, VerifyError};

/// Default budget for one correlation wait.
pub const DEFAULT_CORRELATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait for the first outbound frame matching `predicate`.
///
/// # Errors
///
/// Returns `Timeout` naming the unmet predicate set when no match arrives
/// within `timeout`; a channel that closes mid-wait stops emitting and is
/// reported the same way. A matching payload that fails to decode returns
/// a `Parse` error.
pub async fn await_matching_frame(
    channel: &ControlChannel,
    predicate: &FramePredicate,
    timeout: Duration,
) -> Result<Frame> {
    await_on(channel.sent(), predicate, timeout).await
}

/// Wait for the first inbound frame matching `predicate`.
///
/// Same contract as [`await_matching_frame`], applied to the telemetry
/// direction.
pub async fn await_matching_inbound(
    channel: &ControlChannel,
    predicate: &FramePredicate,
    timeout: Duration,
) -> Result<Frame> {
    await_on(channel.received(), predicate, timeout).await
}

async fn await_on(
    mut subscription: Subscription,
    predicate: &FramePredicate,
    timeout: Duration,
) -> Result<Frame> {
    debug!(direction = %subscription.direction(), %predicate, ?timeout, "Waiting for matching frame");

    let matched = tokio::time::timeout(timeout, async {
        loop {
            match subscription.next().await {
                Some(payload) => {
                    if predicate.matches(&payload) {
                        return payload;
                    }
                    trace!(len = payload.len(), "Payload did not match predicate");
                }
                // The hub is gone: no further frames can arrive. Park until
                // the deadline so callers uniformly observe a timeout.
                None => std::future::pending::<()>().await,
            }
        }
    })
    .await
    .map_err(|_| VerifyError::timeout(predicate.to_string(), timeout))?;

    debug!(%predicate, "Predicate satisfied");
    Frame::decode(&matched)
}
