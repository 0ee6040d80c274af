//! Observability for courier calls.
//!
//! The debug side channel is a boundary contract, not an optional extra: every logged call
//! replaces `Authorization`, `Cookie`, and `Set-Cookie` values with [`REDACTION_MARKER`]
//! before the header map reaches a subscriber, so raw credentials never land in logs.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment the `http_courier_call_total` counter for every
//!   attempt/success/failure, labeled by `call` + `outcome`.

mod metrics;

pub use metrics::*;

// self
use crate::_prelude::*;

/// Marker substituted for sensitive header values in the debug side channel.
pub const REDACTION_MARKER: &str = "<redacted>";

const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

/// Courier operations observed by the obs layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Full request pipeline through the orchestrator.
	Request,
	/// OAuth2 token refresh triggered by a cold or expired cache.
	TokenRefresh,
	/// Body download streamed to a file.
	Download,
}
impl CallKind {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Request => "request",
			CallKind::TokenRefresh => "token_refresh",
			CallKind::Download => "download",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a courier operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Returns a copy of `headers` with sensitive values replaced by [`REDACTION_MARKER`].
pub fn redacted_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
	let mut redacted = BTreeMap::new();

	for name in headers.keys() {
		let value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
			REDACTION_MARKER.to_owned()
		} else {
			headers
				.get_all(name)
				.iter()
				.map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
				.collect::<Vec<_>>()
				.join(", ")
		};

		redacted.insert(name.as_str().to_owned(), value);
	}

	redacted
}

/// Emits one structured debug line describing an outbound call.
pub fn log_request(method: &Method, url: &Url, params: &[(String, String)], headers: &HeaderMap) {
	tracing::debug!(
		method = %method,
		url = %url,
		params = ?params,
		headers = ?redacted_headers(headers),
		"dispatching request",
	);
}
