//! Shared attempt loop driving all retry decorators.
//!
//! One iteration performs the transport call, evaluates the response, and either returns it or
//! disposes of it, waits, refreshes the context, and loops. Attempts are strictly sequential;
//! at most one transport call is outstanding per chain at any time.

// crates.io
use async_trait::async_trait;
// self
use crate::{
	_prelude::*,
	body,
	deferral::MAX_DELAY_MS,
	delay,
	policy::{AttemptBudget, BackoffPolicy, PolicyFactory},
	transport::{AttemptContext, Reply, Transport},
};

/// Decision produced after evaluating a response.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Verdict {
	/// Return the response to the caller unchanged.
	Finish,
	/// Dispose of the response and retry after the computed total wait.
	Wait(Duration),
}

/// Variant-specific behaviour plugged into the shared loop.
#[async_trait]
pub(crate) trait Flow: Send + Sync {
	/// Evaluate a response and decide whether to retry.
	fn assess(&self, reply: &Reply, pacing: &mut Pacing<'_>) -> Result<Verdict>;

	/// Prepare the context before the very first attempt.
	async fn prime(&self, _request: &mut AttemptContext) -> Result<()> {
		Ok(())
	}

	/// Refresh the context before a retry attempt.
	async fn refresh(&self, _request: &mut AttemptContext) -> Result<()> {
		Ok(())
	}
}

/// Lazily instantiated per-chain pacing state.
///
/// The factory runs at most once per chain, on the first retry decision.
pub(crate) struct Pacing<'a> {
	factory: &'a PolicyFactory,
	instance: Option<Box<dyn BackoffPolicy>>,
}
impl<'a> Pacing<'a> {
	pub(crate) fn new(factory: &'a PolicyFactory) -> Self {
		Self { factory, instance: None }
	}

	/// Budget the next attempt, creating the policy instance on first use.
	pub(crate) fn next(&mut self) -> AttemptBudget {
		self.instance.get_or_insert_with(|| (self.factory)()).next_delay()
	}
}

/// Drive the attempt loop until a terminal verdict or failure.
pub(crate) async fn drive<T, F>(
	inner: &T,
	mut request: AttemptContext,
	flow: &F,
	factory: &PolicyFactory,
) -> Result<Reply>
where
	T: Transport,
	F: Flow,
{
	flow.prime(&mut request).await?;

	let mut pacing = Pacing::new(factory);

	loop {
		let reply = inner.send(&request).await?;

		match flow.assess(&reply, &mut pacing)? {
			Verdict::Finish => return Ok(reply),
			Verdict::Wait(total) => {
				if !request.body.is_replayable() {
					return Err(Error::UnreplayableBody);
				}

				tracing::debug!(status = %reply.status, wait = ?total, "retrying request");

				body::release_stale(reply.body);
				delay::wait(total, &request.cancel).await?;
				flow.refresh(&mut request).await?;
			},
		}
	}
}

/// Sum a server-directed delay with a policy delay, guarding the timer ceiling.
///
/// The two delays are summed, not maximized; a single suspension covers the total.
pub(crate) fn total_wait(server: Duration, policy: Duration) -> Result<Duration> {
	if server.as_millis() + policy.as_millis() > MAX_DELAY_MS as u128 {
		return Err(Error::DelayOverflow);
	}

	Ok(server + policy)
}
