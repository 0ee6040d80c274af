//! Retry classification and the exponential backoff schedule.

// self
use crate::_prelude::*;

// urllib-style ceiling so a runaway factor cannot park a thread for hours.
const BACKOFF_CAP_SECS: f64 = 120.;

/// Immutable per-session retry policy.
///
/// A response is retried when its status is listed in `retryable_status_codes` and the
/// request method is listed in `retryable_methods`. Connection-level failures consume the
/// same `max_retries` budget.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
	/// Re-attempts allowed after the first try; `0` disables retries.
	pub max_retries: u32,
	/// Base factor of the backoff schedule, in seconds.
	pub backoff_factor: f64,
	/// Statuses classified as transient.
	pub retryable_status_codes: Vec<u16>,
	/// Methods eligible for automatic re-attempts.
	pub retryable_methods: Vec<Method>,
}
impl RetryPolicy {
	/// Returns `true` when a `status` answer to a `method` request is retryable.
	pub fn should_retry(&self, status: StatusCode, method: &Method) -> bool {
		self.retryable_status_codes.contains(&status.as_u16())
			&& self.retryable_methods.contains(method)
	}

	/// Sleep before re-attempting after attempt number `attempt` (1-based):
	/// `backoff_factor * 2^(attempt - 1)` seconds, capped.
	pub fn backoff_delay(&self, attempt: u32) -> StdDuration {
		let factor = self.backoff_factor.max(0.);
		let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
		let seconds = (factor * 2_f64.powi(exponent)).min(BACKOFF_CAP_SECS);

		StdDuration::from_secs_f64(seconds)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			backoff_factor: 0.3,
			retryable_status_codes: vec![500, 502, 503, 504],
			retryable_methods: vec![Method::GET, Method::POST, Method::PUT, Method::DELETE],
		}
	}
}
