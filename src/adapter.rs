//! Transport adapter backed by a [`reqwest`] client.

// crates.io
use async_trait::async_trait;
use reqwest::{Client, Response};
// self
use crate::{
	_prelude::*,
	body::ReleasableBody,
	transport::{AttemptContext, Reply, RequestBody, Transport},
};

/// [`Transport`] dispatching attempts through a shared [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: Client,
}
impl ReqwestTransport {
	/// Build an adapter with a default client.
	pub fn new() -> Result<Self> {
		let client = Client::builder()
			.user_agent(format!("send-retry/{}", env!("CARGO_PKG_VERSION")))
			.connect_timeout(Duration::from_secs(5))
			.build()?;

		Ok(Self { client })
	}

	/// Wrap an existing client.
	pub fn with_client(client: Client) -> Self {
		Self { client }
	}

	async fn dispatch(&self, request: &AttemptContext) -> Result<Reply> {
		let mut builder = self.client.request(request.method.clone(), request.url.clone());

		for (name, value) in request.headers.iter() {
			builder = builder.header(name, value);
		}

		match &request.body {
			RequestBody::Empty => {},
			RequestBody::Buffered(bytes) => builder = builder.body(bytes.clone()),
			RequestBody::Streaming =>
				return Err(Error::Validation {
					field: "body",
					reason: "Single-use streams are not supported by the reqwest adapter.".into(),
				}),
		}

		let response = builder.send().await?;
		let status = response.status();
		let headers = response.headers().clone();

		Ok(Reply { status, headers, body: Some(Box::new(DroppableBody { response })) })
	}
}
#[async_trait]
impl Transport for ReqwestTransport {
	async fn send(&self, request: &AttemptContext) -> Result<Reply> {
		if request.cancel.is_cancelled() {
			return Err(Error::Cancelled { phase: "transport" });
		}

		tokio::select! {
			() = request.cancel.cancelled() => Err(Error::Cancelled { phase: "transport" }),
			reply = self.dispatch(request) => reply,
		}
	}
}

/// Response handle whose release drops the undrained body stream.
#[derive(Debug)]
struct DroppableBody {
	response: Response,
}
impl ReleasableBody for DroppableBody {
	fn release(self: Box<Self>, reason: &str) -> Result<()> {
		tracing::debug!(reason, status = %self.response.status(), "dropping undrained response body");

		Ok(())
	}
}
