//! Backoff policies governing retry pacing.
//!
//! A policy instance is stateful and owned exclusively by one top-level call chain; the
//! decorators obtain a fresh instance per chain through a [`PolicyFactory`], created lazily on
//! the first retry decision.

// std
use std::cell::RefCell;
// crates.io
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
// self
use crate::_prelude::*;

thread_local! {
	static SMALL_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_rng(&mut rand::rng()));
}

/// Result of budgeting a retry attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptBudget {
	/// Additional attempt is permitted after the provided delay.
	Granted {
		/// Delay to observe before the upcoming attempt.
		delay: Duration,
	},
	/// Retry budget exhausted; no further attempts allowed.
	Exhausted,
}

/// Caller-supplied pacing strategy producing successive wait durations.
pub trait BackoffPolicy: Send {
	/// Budget the next attempt, returning either the permitted delay or exhaustion.
	fn next_delay(&mut self) -> AttemptBudget;
}

/// Factory invoked once per top-level call chain to obtain a fresh policy instance.
pub type PolicyFactory = Arc<dyn Fn() -> Box<dyn BackoffPolicy> + Send + Sync>;

/// Supported jitter strategies for exponential backoff.
#[derive(Clone, Debug, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
	/// No jitter; deterministic backoff schedule.
	None,
	/// Full jitter; randomize delay between 80% of the current backoff and its cap.
	#[default]
	Full,
	/// Decorrelated jitter per AWS architecture guidance.
	Decorrelated,
}

/// Exponential backoff configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExponentialBackoff {
	/// Maximum number of retry attempts to perform after the initial request.
	pub max_retries: u32,
	/// Initial delay before retrying after a failure.
	pub initial_backoff: Duration,
	/// Upper bound applied to exponential backoff growth.
	pub max_backoff: Duration,
	/// Strategy used to randomize the computed backoff.
	#[serde(default)]
	pub jitter: JitterStrategy,
}
impl ExponentialBackoff {
	/// Validate invariants for the backoff configuration.
	pub fn validate(&self) -> Result<()> {
		if self.initial_backoff.is_zero() {
			return Err(Error::Validation {
				field: "backoff.initial_backoff",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.max_backoff < self.initial_backoff {
			return Err(Error::Validation {
				field: "backoff.max_backoff",
				reason: "Must be greater than or equal to initial_backoff.".into(),
			});
		}

		Ok(())
	}

	/// Compute backoff for a retry attempt using the selected jitter strategy.
	pub fn compute_backoff(&self, attempt: u32) -> Duration {
		let exponent = attempt.min(32);
		let base = self.initial_backoff.mul_f64(2f64.powi(exponent as i32));
		let bounded = base.min(self.max_backoff).max(self.initial_backoff);

		self.apply_jitter(bounded, attempt)
	}

	/// Build a factory handing each call chain its own pacing state.
	pub fn factory(self) -> PolicyFactory {
		Arc::new(move || {
			Box::new(ExponentialPacing { config: self.clone(), retries_used: 0 })
				as Box<dyn BackoffPolicy>
		})
	}

	fn apply_jitter(&self, bounded: Duration, attempt: u32) -> Duration {
		match self.jitter {
			JitterStrategy::None => bounded,
			JitterStrategy::Full => {
				let lower = bounded.mul_f64(0.8).max(self.initial_backoff);
				let upper = bounded.min(self.max_backoff);

				random_within(lower, upper)
			},
			JitterStrategy::Decorrelated => {
				let prev = if attempt == 0 { self.initial_backoff } else { bounded };
				let ceiling = self.max_backoff.min(prev.mul_f64(3.0));

				random_within(self.initial_backoff, ceiling.max(self.initial_backoff))
			},
		}
	}
}
impl Default for ExponentialBackoff {
	fn default() -> Self {
		Self {
			max_retries: 2,
			initial_backoff: Duration::from_millis(250),
			max_backoff: Duration::from_secs(2),
			jitter: JitterStrategy::Full,
		}
	}
}

/// Stateful pacing derived from an [`ExponentialBackoff`] configuration.
#[derive(Debug)]
pub struct ExponentialPacing {
	config: ExponentialBackoff,
	retries_used: u32,
}
impl BackoffPolicy for ExponentialPacing {
	fn next_delay(&mut self) -> AttemptBudget {
		if self.retries_used >= self.config.max_retries {
			tracing::debug!(attempt = self.retries_used, "retry budget exhausted");

			return AttemptBudget::Exhausted;
		}

		let attempt = self.retries_used;

		self.retries_used = self.retries_used.saturating_add(1);

		let delay = self.config.compute_backoff(attempt);

		tracing::debug!(attempt = attempt + 1, ?delay, "retry backoff computed");

		AttemptBudget::Granted { delay }
	}
}

/// Fixed-delay pacing with a bounded attempt count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantPacing {
	delay: Duration,
	remaining: u32,
}
impl ConstantPacing {
	/// Pacing that grants `attempts` retries with the same delay before each.
	pub fn new(delay: Duration, attempts: u32) -> Self {
		Self { delay, remaining: attempts }
	}

	/// Zero-delay pacing that defers entirely to server-directed timing.
	pub fn attempts(attempts: u32) -> Self {
		Self::new(Duration::ZERO, attempts)
	}

	/// Build a factory handing each call chain its own countdown.
	pub fn factory(self) -> PolicyFactory {
		Arc::new(move || Box::new(self) as Box<dyn BackoffPolicy>)
	}
}
impl BackoffPolicy for ConstantPacing {
	fn next_delay(&mut self) -> AttemptBudget {
		if self.remaining == 0 {
			return AttemptBudget::Exhausted;
		}

		self.remaining -= 1;

		AttemptBudget::Granted { delay: self.delay }
	}
}

fn random_within(min: Duration, max: Duration) -> Duration {
	if max <= min {
		return max;
	}
	SMALL_RNG.with(|cell| {
		let mut rng = cell.borrow_mut();
		let nanos = max.as_nanos() - min.as_nanos();
		let jitter = rng.random_range(0..=nanos.min(u64::MAX as u128));

		min + Duration::from_nanos(jitter as u64)
	})
}
