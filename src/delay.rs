//! Cancellation-aware delay primitive.

// crates.io
use tokio::{task, time};
// self
use crate::_prelude::*;

/// Suspend the current task for `duration`, aborting the instant `cancel` fires.
///
/// An already-cancelled token fails without scheduling any wait. A zero duration still yields
/// to the scheduler once before resolving, so a zero-delay retry happens on the next turn
/// rather than synchronously.
pub async fn wait(duration: Duration, cancel: &CancellationToken) -> Result<()> {
	if cancel.is_cancelled() {
		return Err(Error::Cancelled { phase: "delay" });
	}
	if duration.is_zero() {
		task::yield_now().await;

		return Ok(());
	}

	tokio::select! {
		() = cancel.cancelled() => Err(Error::Cancelled { phase: "delay" }),
		() = time::sleep(duration) => Ok(()),
	}
}
