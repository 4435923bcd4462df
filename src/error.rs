//! Crate-wide error types and `Result` alias.

// std
use std::time::Duration;
// self
use crate::deferral::MAX_DELAY_MS;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the retry decorators.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[error("Transport failure: {0}")]
	Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

	#[error("Cancelled during {phase}.")]
	Cancelled { phase: &'static str },
	#[error("Server-declared delay of {declared:?} exceeds the configured ceiling of {ceiling:?}.")]
	DelayCeiling { declared: Duration, ceiling: Duration },
	#[error("Retry delay exceeds the maximum supported timer duration of {} ms.", MAX_DELAY_MS)]
	DelayOverflow,
	#[error("Request body is a single-use stream and cannot be resent.")]
	UnreplayableBody,
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
