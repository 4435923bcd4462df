//! Abstract transport surface consumed by the retry decorators.

// crates.io
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use url::Url;
// self
use crate::{_prelude::*, body::ReleasableBody};

/// Single "perform one request" operation supplied by the hosting environment.
///
/// Decorators treat the implementation as opaque and invoke it with identical arguments on
/// every attempt, the authorization header excepted. The cancellation token travels inside the
/// request context; honouring it mid-call is the transport's responsibility.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Perform one transport attempt for the supplied context.
	async fn send(&self, request: &AttemptContext) -> Result<Reply>;
}

/// The (target, options) pair resent on every retry attempt.
///
/// Constructed once per top-level call and identical across attempts, except for the
/// authorization header which the credential-refresh decorator may rebuild between attempts.
#[derive(Clone, Debug)]
pub struct AttemptContext {
	/// HTTP method used for every attempt.
	pub method: Method,
	/// Request target.
	pub url: Url,
	/// Headers sent with every attempt.
	pub headers: HeaderMap,
	/// Request payload representation.
	pub body: RequestBody,
	/// Cancellation capability observed during transport calls and waits.
	pub cancel: CancellationToken,
}
impl AttemptContext {
	/// Construct a context for the given method and target URL.
	pub fn new(method: Method, url: impl AsRef<str>) -> Result<Self> {
		let url = Url::parse(url.as_ref())?;

		Ok(Self {
			method,
			url,
			headers: HeaderMap::new(),
			body: RequestBody::Empty,
			cancel: CancellationToken::new(),
		})
	}

	/// Convenience constructor for GET requests.
	pub fn get(url: impl AsRef<str>) -> Result<Self> {
		Self::new(Method::GET, url)
	}

	/// Attach a header, replacing any previous value under the same name.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Attach a buffered, replayable request payload.
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = RequestBody::Buffered(body.into());

		self
	}

	/// Mark the payload as a caller-owned single-use stream.
	pub fn with_streaming_body(mut self) -> Self {
		self.body = RequestBody::Streaming;

		self
	}

	/// Observe the supplied cancellation token across attempts and waits.
	pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;

		self
	}
}

/// Request payload representations distinguished by replayability.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
	/// No payload.
	#[default]
	Empty,
	/// Buffered payload that can be resent verbatim.
	Buffered(Bytes),
	/// Single-use stream supplied by the caller; refused on retry, never silently duplicated.
	Streaming,
}
impl RequestBody {
	/// Whether the payload can be resent on a retry attempt.
	pub fn is_replayable(&self) -> bool {
		!matches!(self, RequestBody::Streaming)
	}
}

/// Response surface observed by the decorators.
#[derive(Debug)]
pub struct Reply {
	/// Status code returned by the transport.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Optional one-shot streamed body.
	pub body: Option<Box<dyn ReleasableBody>>,
}
impl Reply {
	/// Construct a body-less reply with empty headers.
	pub fn new(status: StatusCode) -> Self {
		Self { status, headers: HeaderMap::new(), body: None }
	}

	/// Attach a header, replacing any previous value under the same name.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Attach a one-shot streamed body.
	pub fn with_body(mut self, body: Box<dyn ReleasableBody>) -> Self {
		self.body = Some(body);

		self
	}
}
