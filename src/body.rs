//! Response body release capability.

// std
use std::fmt::Debug;
// self
use crate::_prelude::*;

/// Reason tag cited when a response body is released because a retry supersedes it.
pub const RELEASE_REASON: &str = "superseded by retry";

/// One-shot streamed response body that can be released without being read.
///
/// Absence of a body is modelled as `None` on the response, not as a no-op implementation.
pub trait ReleasableBody: Debug + Send {
	/// Release the underlying stream, citing the supplied reason.
	fn release(self: Box<Self>, reason: &str) -> Result<()>;
}

/// Release a superseded response body, swallowing any failure.
///
/// A stale body must never block a retry; failures are only logged.
pub(crate) fn release_stale(body: Option<Box<dyn ReleasableBody>>) {
	let Some(body) = body else {
		return;
	};

	if let Err(err) = body.release(RELEASE_REASON) {
		tracing::debug!(error = %err, "stale response body release failed");
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	};
	// self
	use super::*;

	#[derive(Debug)]
	struct FlaggedBody {
		released: Arc<AtomicBool>,
		fail: bool,
	}
	impl ReleasableBody for FlaggedBody {
		fn release(self: Box<Self>, reason: &str) -> Result<()> {
			assert_eq!(reason, RELEASE_REASON);

			self.released.store(true, Ordering::SeqCst);

			if self.fail {
				Err(Error::Transport("stream already consumed".into()))
			} else {
				Ok(())
			}
		}
	}

	#[test]
	fn releases_present_body_with_the_documented_reason() {
		let released = Arc::new(AtomicBool::new(false));

		release_stale(Some(Box::new(FlaggedBody { released: released.clone(), fail: false })));

		assert!(released.load(Ordering::SeqCst));
	}

	#[test]
	fn swallows_release_failures() {
		let released = Arc::new(AtomicBool::new(false));

		release_stale(Some(Box::new(FlaggedBody { released: released.clone(), fail: true })));

		assert!(released.load(Ordering::SeqCst));
	}

	#[test]
	fn absent_body_is_a_no_op() {
		release_stale(None);
	}
}
