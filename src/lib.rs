//! Composable async retry decorators for HTTP send operations — server-directed deferral,
//! client-side backoff, and credential refresh.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod adapter;
pub mod body;
pub mod deferral;
pub mod delay;
pub mod policy;
pub mod retry;
pub mod transport;

mod error;
mod _prelude {
	pub use std::{
		sync::Arc,
		time::{Duration, SystemTime},
	};

	pub use tokio_util::sync::CancellationToken;

	pub use crate::{Error, Result};
}

pub use crate::{
	error::{Error, Result},
	policy::{
		AttemptBudget, BackoffPolicy, ConstantPacing, ExponentialBackoff, JitterStrategy,
		PolicyFactory,
	},
	retry::{
		auth::{AuthRetry, TokenPair, TokenProvider},
		backoff::BackoffRetry,
		deferral::DeferralRetry,
	},
	transport::{AttemptContext, Reply, RequestBody, Transport},
};
