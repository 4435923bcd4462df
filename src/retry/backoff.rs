//! Retry decorator driven purely by a client-side backoff policy.

// std
use std::collections::HashSet;
// crates.io
use async_trait::async_trait;
use http::StatusCode;
// self
use crate::{
	_prelude::*,
	policy::{AttemptBudget, PolicyFactory},
	retry::engine::{self, Flow, Pacing, Verdict},
	transport::{AttemptContext, Reply, Transport},
};

/// Decorator repeating requests on transient status codes with policy-directed pacing.
///
/// No server header is consulted; the wait before each retry is exactly what the policy grants,
/// and policy exhaustion returns the last response unchanged.
pub struct BackoffRetry<T> {
	inner: T,
	flow: BackoffFlow,
	strategy: PolicyFactory,
}
impl<T> BackoffRetry<T> {
	/// Wrap a transport with policy-paced retries on 408, 429, 500, 502, 503, and 504.
	pub fn new(inner: T, strategy: PolicyFactory) -> Self {
		Self { inner, flow: BackoffFlow { retryable: default_statuses() }, strategy }
	}

	/// Replace the set of statuses eligible for policy-paced retries.
	///
	/// An empty set disables retrying entirely.
	pub fn with_retryable(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
		self.flow.retryable = statuses.into_iter().collect();

		self
	}
}
#[async_trait]
impl<T> Transport for BackoffRetry<T>
where
	T: Transport,
{
	async fn send(&self, request: &AttemptContext) -> Result<Reply> {
		engine::drive(&self.inner, request.clone(), &self.flow, &self.strategy).await
	}
}

struct BackoffFlow {
	retryable: HashSet<StatusCode>,
}
#[async_trait]
impl Flow for BackoffFlow {
	fn assess(&self, reply: &Reply, pacing: &mut Pacing<'_>) -> Result<Verdict> {
		if !self.retryable.contains(&reply.status) {
			return Ok(Verdict::Finish);
		}

		match pacing.next() {
			AttemptBudget::Exhausted => Ok(Verdict::Finish),
			AttemptBudget::Granted { delay } =>
				Ok(Verdict::Wait(engine::total_wait(Duration::ZERO, delay)?)),
		}
	}
}

fn default_statuses() -> HashSet<StatusCode> {
	HashSet::from([
		StatusCode::REQUEST_TIMEOUT,
		StatusCode::TOO_MANY_REQUESTS,
		StatusCode::INTERNAL_SERVER_ERROR,
		StatusCode::BAD_GATEWAY,
		StatusCode::SERVICE_UNAVAILABLE,
		StatusCode::GATEWAY_TIMEOUT,
	])
}
