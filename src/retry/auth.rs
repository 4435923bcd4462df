//! Retry decorator re-acquiring credentials after authorization failures.

// crates.io
use async_trait::async_trait;
use http::{HeaderValue, StatusCode, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	policy::{AttemptBudget, PolicyFactory},
	retry::engine::{self, Flow, Pacing, Verdict},
	transport::{AttemptContext, Reply, Transport},
};

/// Credential value and scheme used to build an authorization header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
	/// Credential value presented to the server.
	pub value: String,
	/// Authorization scheme name, e.g. `Bearer`.
	pub scheme: String,
}
impl TokenPair {
	/// Construct a token pair from its credential value and scheme.
	pub fn new(value: impl Into<String>, scheme: impl Into<String>) -> Self {
		Self { value: value.into(), scheme: scheme.into() }
	}

	/// Validate both fields and render the authorization header value.
	pub fn header_value(&self) -> Result<HeaderValue> {
		if self.scheme.is_empty() {
			return Err(Error::Validation {
				field: "token.scheme",
				reason: "Must not be empty.".into(),
			});
		}
		if self.value.is_empty() {
			return Err(Error::Validation {
				field: "token.value",
				reason: "Must not be empty.".into(),
			});
		}

		HeaderValue::from_str(&format!("{} {}", self.scheme, self.value)).map_err(|err| {
			Error::Validation { field: "token", reason: format!("Not a valid header value: {err}.") }
		})
	}
}

/// Supplies a token pair on demand.
///
/// Re-invoked before every authorization-triggered retry; acquisition failures propagate
/// immediately and are never retried themselves.
#[async_trait]
pub trait TokenProvider: Send + Sync {
	/// Acquire a fresh token pair.
	async fn acquire(&self) -> Result<TokenPair>;
}

/// Decorator repeating requests once credentials have been re-acquired after a 401.
///
/// A caller-supplied authorization header is honoured on the very first attempt and suppresses
/// the initial acquisition; every 401-triggered retry unconditionally re-acquires and rebuilds
/// the header. The strategy governs only the retry cadence, not header injection timing.
pub struct AuthRetry<T> {
	inner: T,
	flow: AuthFlow,
	strategy: PolicyFactory,
}
impl<T> AuthRetry<T> {
	/// Wrap a transport with credential-refresh retries on 401.
	pub fn new(inner: T, provider: Arc<dyn TokenProvider>, strategy: PolicyFactory) -> Self {
		Self { inner, flow: AuthFlow { provider }, strategy }
	}
}
#[async_trait]
impl<T> Transport for AuthRetry<T>
where
	T: Transport,
{
	async fn send(&self, request: &AttemptContext) -> Result<Reply> {
		engine::drive(&self.inner, request.clone(), &self.flow, &self.strategy).await
	}
}

struct AuthFlow {
	provider: Arc<dyn TokenProvider>,
}
impl AuthFlow {
	async fn inject(&self, request: &mut AttemptContext) -> Result<()> {
		let token = self.provider.acquire().await?;
		let value = token.header_value()?;

		request.headers.insert(AUTHORIZATION, value);

		Ok(())
	}
}
#[async_trait]
impl Flow for AuthFlow {
	fn assess(&self, reply: &Reply, pacing: &mut Pacing<'_>) -> Result<Verdict> {
		if reply.status != StatusCode::UNAUTHORIZED {
			return Ok(Verdict::Finish);
		}

		match pacing.next() {
			AttemptBudget::Exhausted => Ok(Verdict::Finish),
			AttemptBudget::Granted { delay } =>
				Ok(Verdict::Wait(engine::total_wait(Duration::ZERO, delay)?)),
		}
	}

	async fn prime(&self, request: &mut AttemptContext) -> Result<()> {
		// A caller-supplied header is honoured on the first attempt only.
		if request.headers.contains_key(AUTHORIZATION) {
			return Ok(());
		}

		self.inject(request).await
	}

	async fn refresh(&self, request: &mut AttemptContext) -> Result<()> {
		self.inject(request).await
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	struct CountingProvider {
		issued: AtomicUsize,
	}
	impl CountingProvider {
		fn new() -> Arc<Self> {
			Arc::new(Self { issued: AtomicUsize::new(0) })
		}

		fn issued(&self) -> usize {
			self.issued.load(Ordering::SeqCst)
		}
	}
	#[async_trait]
	impl TokenProvider for CountingProvider {
		async fn acquire(&self) -> Result<TokenPair> {
			let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

			Ok(TokenPair::new(format!("fresh-{n}"), "Bearer"))
		}
	}

	fn request() -> AttemptContext {
		AttemptContext::get("https://example.com/resource").expect("context")
	}

	fn authorization(request: &AttemptContext) -> Option<&str> {
		request.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
	}

	#[test]
	fn header_value_joins_scheme_and_credential() {
		let value = TokenPair::new("token-1", "Bearer").header_value().expect("header value");

		assert_eq!(value.to_str().ok(), Some("Bearer token-1"));
	}

	#[test]
	fn empty_fields_fail_closed() {
		assert!(matches!(
			TokenPair::new("", "Bearer").header_value(),
			Err(Error::Validation { field: "token.value", .. })
		));
		assert!(matches!(
			TokenPair::new("token-1", "").header_value(),
			Err(Error::Validation { field: "token.scheme", .. })
		));
	}

	#[test]
	fn control_characters_are_rejected() {
		assert!(matches!(
			TokenPair::new("token\n", "Bearer").header_value(),
			Err(Error::Validation { field: "token", .. })
		));
	}

	#[tokio::test]
	async fn prime_honours_a_caller_supplied_header() {
		let provider = CountingProvider::new();
		let flow = AuthFlow { provider: provider.clone() };
		let mut context = request()
			.with_header(AUTHORIZATION, HeaderValue::from_static("Bearer caller-supplied"));

		flow.prime(&mut context).await.expect("prime");

		assert_eq!(provider.issued(), 0);
		assert_eq!(authorization(&context), Some("Bearer caller-supplied"));
	}

	#[tokio::test]
	async fn prime_acquires_when_no_header_is_present() {
		let provider = CountingProvider::new();
		let flow = AuthFlow { provider: provider.clone() };
		let mut context = request();

		flow.prime(&mut context).await.expect("prime");

		assert_eq!(provider.issued(), 1);
		assert_eq!(authorization(&context), Some("Bearer fresh-1"));
	}

	#[tokio::test]
	async fn refresh_overwrites_the_caller_supplied_header() {
		let provider = CountingProvider::new();
		let flow = AuthFlow { provider: provider.clone() };
		let mut context = request()
			.with_header(AUTHORIZATION, HeaderValue::from_static("Bearer caller-supplied"));

		flow.refresh(&mut context).await.expect("refresh");

		assert_eq!(provider.issued(), 1);
		assert_eq!(authorization(&context), Some("Bearer fresh-1"));
	}

	#[tokio::test]
	async fn non_unauthorized_status_finishes() {
		let provider = CountingProvider::new();
		let flow = AuthFlow { provider };
		let factory = crate::policy::ConstantPacing::attempts(3).factory();
		let mut pacing = Pacing::new(&factory);
		let verdict = flow.assess(&Reply::new(StatusCode::FORBIDDEN), &mut pacing).expect("verdict");

		assert!(matches!(verdict, Verdict::Finish));
	}
}
