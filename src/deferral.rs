//! Parsing for the `Retry-After` response header.
//!
//! Exactly two textual forms are recognised: delta-seconds (ASCII digits, whole seconds) and
//! IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`). Everything else (fractional or negative
//! values, ISO-8601, RFC 850, asctime, non-GMT zones) is [`DeferralValue::Invalid`], which the
//! decorators treat as "do not retry", never as "retry with zero delay".

// crates.io
use http::{HeaderMap, header::RETRY_AFTER};
// self
use crate::_prelude::*;

/// Maximum delay representable by the timer, in milliseconds.
pub const MAX_DELAY_MS: u64 = i32::MAX as u64;

/// Outcome of interpreting a `Retry-After` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferralValue {
	/// Header declared a well-formed delay.
	Wait(Duration),
	/// Header absent or not matching either recognised form.
	Invalid,
	/// Well-formed value whose magnitude exceeds [`MAX_DELAY_MS`].
	Overflow,
}

/// Interpret the `Retry-After` header of a response relative to the current instant.
pub fn from_headers(headers: &HeaderMap) -> DeferralValue {
	headers
		.get(RETRY_AFTER)
		.and_then(|value| value.to_str().ok())
		.map(|raw| parse(raw, SystemTime::now()))
		.unwrap_or(DeferralValue::Invalid)
}

/// Parse a raw `Retry-After` value against the supplied reference instant.
///
/// Date-form values in the past resolve to a zero delay.
pub fn parse(raw: &str, now: SystemTime) -> DeferralValue {
	if is_delta_seconds(raw) {
		return parse_delta_seconds(raw);
	}
	if is_fixdate(raw) {
		return parse_fixdate(raw, now);
	}

	DeferralValue::Invalid
}

fn is_delta_seconds(raw: &str) -> bool {
	!raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}

fn parse_delta_seconds(raw: &str) -> DeferralValue {
	// Digit-only input that fails to parse can only have overflowed the integer type.
	let Ok(seconds) = raw.parse::<u64>() else {
		return DeferralValue::Overflow;
	};

	match seconds.checked_mul(1_000) {
		Some(millis) if millis <= MAX_DELAY_MS => DeferralValue::Wait(Duration::from_millis(millis)),
		_ => DeferralValue::Overflow,
	}
}

// IMF-fixdate is fixed-width; the shape check keeps httpdate from accepting the
// RFC 850 and asctime forms it also understands.
fn is_fixdate(raw: &str) -> bool {
	let bytes = raw.as_bytes();

	bytes.len() == 29 && bytes[3] == b',' && bytes[4] == b' ' && raw.ends_with(" GMT")
}

fn parse_fixdate(raw: &str, now: SystemTime) -> DeferralValue {
	let Ok(instant) = httpdate::parse_http_date(raw) else {
		return DeferralValue::Invalid;
	};
	let delay = instant.duration_since(now).unwrap_or(Duration::ZERO);

	if delay.as_millis() > MAX_DELAY_MS as u128 {
		DeferralValue::Overflow
	} else {
		DeferralValue::Wait(delay)
	}
}
