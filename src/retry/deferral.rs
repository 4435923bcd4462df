//! Retry decorator driven by the server-supplied `Retry-After` header.

// std
use std::collections::HashSet;
// crates.io
use async_trait::async_trait;
use http::StatusCode;
// self
use crate::{
	_prelude::*,
	deferral::{self, DeferralValue},
	policy::{AttemptBudget, PolicyFactory},
	retry::engine::{self, Flow, Pacing, Verdict},
	transport::{AttemptContext, Reply, Transport},
};

/// Decorator repeating requests whose response declares a deferral window.
///
/// The client-side policy is authoritative for the attempt count; the server value is
/// authoritative for the wait duration. The two delays are summed and covered by a single
/// suspension. A response without a well-formed `Retry-After` value is returned as-is.
pub struct DeferralRetry<T> {
	inner: T,
	flow: DeferralFlow,
	strategy: PolicyFactory,
}
impl<T> DeferralRetry<T> {
	/// Wrap a transport with deferral-driven retries on 429 and 503.
	///
	/// Pass [`ConstantPacing::attempts`](crate::policy::ConstantPacing::attempts) as the
	/// strategy to respect the server's timing exactly.
	pub fn new(inner: T, strategy: PolicyFactory) -> Self {
		Self {
			inner,
			flow: DeferralFlow { retryable: default_statuses(), max_server_delay: None },
			strategy,
		}
	}

	/// Replace the set of statuses eligible for deferral-driven retries.
	///
	/// An empty set disables retrying entirely.
	pub fn with_retryable(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
		self.flow.retryable = statuses.into_iter().collect();

		self
	}

	/// Reject server-declared delays above the supplied ceiling.
	pub fn with_max_server_delay(mut self, ceiling: Duration) -> Self {
		self.flow.max_server_delay = Some(ceiling);

		self
	}
}
#[async_trait]
impl<T> Transport for DeferralRetry<T>
where
	T: Transport,
{
	async fn send(&self, request: &AttemptContext) -> Result<Reply> {
		engine::drive(&self.inner, request.clone(), &self.flow, &self.strategy).await
	}
}

struct DeferralFlow {
	retryable: HashSet<StatusCode>,
	max_server_delay: Option<Duration>,
}
#[async_trait]
impl Flow for DeferralFlow {
	fn assess(&self, reply: &Reply, pacing: &mut Pacing<'_>) -> Result<Verdict> {
		if !self.retryable.contains(&reply.status) {
			return Ok(Verdict::Finish);
		}

		let server = match deferral::from_headers(&reply.headers) {
			DeferralValue::Wait(delay) => delay,
			DeferralValue::Invalid => return Ok(Verdict::Finish),
			DeferralValue::Overflow => return Err(Error::DelayOverflow),
		};

		// The ceiling is enforced before the policy is consulted; a rejected
		// delay must not consume client budget.
		if let Some(ceiling) = self.max_server_delay
			&& server > ceiling
		{
			return Err(Error::DelayCeiling { declared: server, ceiling });
		}

		match pacing.next() {
			AttemptBudget::Exhausted => Ok(Verdict::Finish),
			AttemptBudget::Granted { delay } => Ok(Verdict::Wait(engine::total_wait(server, delay)?)),
		}
	}
}

fn default_statuses() -> HashSet<StatusCode> {
	HashSet::from([StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE])
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::{HeaderValue, header::RETRY_AFTER};
	// self
	use super::*;
	use crate::policy::ConstantPacing;

	fn deferred(status: StatusCode, raw: &'static str) -> Reply {
		Reply::new(status).with_header(RETRY_AFTER, HeaderValue::from_static(raw))
	}

	fn assess(flow: &DeferralFlow, reply: &Reply, attempts: u32) -> Result<Verdict> {
		let factory = ConstantPacing::attempts(attempts).factory();
		let mut pacing = Pacing::new(&factory);

		flow.assess(reply, &mut pacing)
	}

	fn flow() -> DeferralFlow {
		DeferralFlow { retryable: default_statuses(), max_server_delay: None }
	}

	#[test]
	fn non_retryable_status_finishes_even_with_a_valid_header() {
		let verdict = assess(&flow(), &deferred(StatusCode::OK, "5"), 3).expect("verdict");

		assert!(matches!(verdict, Verdict::Finish));
	}

	#[test]
	fn missing_header_passes_the_response_through() {
		let verdict =
			assess(&flow(), &Reply::new(StatusCode::TOO_MANY_REQUESTS), 3).expect("verdict");

		assert!(matches!(verdict, Verdict::Finish));
	}

	#[test]
	fn malformed_header_passes_the_response_through() {
		let verdict = assess(&flow(), &deferred(StatusCode::SERVICE_UNAVAILABLE, "later"), 3)
			.expect("verdict");

		assert!(matches!(verdict, Verdict::Finish));
	}

	#[test]
	fn valid_header_yields_the_declared_wait() {
		let verdict =
			assess(&flow(), &deferred(StatusCode::TOO_MANY_REQUESTS, "2"), 3).expect("verdict");

		assert!(matches!(verdict, Verdict::Wait(total) if total == Duration::from_secs(2)));
	}

	#[test]
	fn policy_delay_is_added_on_top_of_the_server_delay() {
		let factory = ConstantPacing::new(Duration::from_millis(500), 3).factory();
		let mut pacing = Pacing::new(&factory);
		let verdict = flow()
			.assess(&deferred(StatusCode::TOO_MANY_REQUESTS, "2"), &mut pacing)
			.expect("verdict");

		assert!(matches!(verdict, Verdict::Wait(total) if total == Duration::from_millis(2_500)));
	}

	#[test]
	fn exhausted_policy_finishes_despite_a_valid_server_delay() {
		let verdict =
			assess(&flow(), &deferred(StatusCode::SERVICE_UNAVAILABLE, "1"), 0).expect("verdict");

		assert!(matches!(verdict, Verdict::Finish));
	}

	#[test]
	fn server_delay_above_the_ceiling_is_a_constraint_failure() {
		let flow = DeferralFlow {
			retryable: default_statuses(),
			max_server_delay: Some(Duration::from_millis(500)),
		};
		let result = assess(&flow, &deferred(StatusCode::TOO_MANY_REQUESTS, "2"), 3);

		assert!(matches!(
			result,
			Err(Error::DelayCeiling { declared, ceiling })
				if declared == Duration::from_secs(2) && ceiling == Duration::from_millis(500)
		));
	}

	#[test]
	fn overflowing_header_magnitude_is_a_range_failure() {
		let result = assess(&flow(), &deferred(StatusCode::TOO_MANY_REQUESTS, "9999999999"), 3);

		assert!(matches!(result, Err(Error::DelayOverflow)));
	}

	#[test]
	fn empty_retryable_set_disables_retrying() {
		let flow = DeferralFlow { retryable: HashSet::new(), max_server_delay: None };
		let verdict =
			assess(&flow, &deferred(StatusCode::TOO_MANY_REQUESTS, "1"), 3).expect("verdict");

		assert!(matches!(verdict, Verdict::Finish));
	}
}
