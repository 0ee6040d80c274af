//! Courier-level error types shared across auth resolution, sessions, and key management.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Courier-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical courier error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token endpoint rejection or malformed token material.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transient transport failure that exhausted the retry budget.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure surfaced without retry (TLS, proxy).
	#[error(transparent)]
	Transport(#[from] TransportFailure),
	/// Key quota failure.
	#[error(transparent)]
	Quota(#[from] QuotaError),
	/// Download persistence failure, independent of transport success.
	#[error(transparent)]
	Persistence(#[from] PersistenceError),
}

/// Configuration and validation failures raised by the courier.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request URL cannot be parsed.
	#[error("Request URL is invalid: {url}.")]
	InvalidUrl {
		/// URL text that failed parsing.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Proxy route rejected by the transport.
	#[error("Proxy route is invalid: {url}.")]
	InvalidProxy {
		/// Proxy URL that was rejected.
		url: String,
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// Basic credentials cannot be encoded into an `Authorization` header.
	#[error("Basic auth username must not contain ':'.")]
	MalformedBasicCredentials,
	/// A header value produced during resolution is not representable.
	#[error("The {name} header value contains characters that cannot be sent.")]
	UnrepresentableHeader {
		/// Header the courier attempted to set.
		name: &'static str,
	},
	/// Background task thread could not be spawned.
	#[error("Background task could not be spawned.")]
	BackgroundTask(#[from] std::io::Error),
}
impl ConfigError {
	/// Wraps a transport builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Failures raised while acquiring or refreshing OAuth2 tokens.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with a non-2xx status.
	#[error("Token endpoint rejected the refresh with status {status}: {body}.")]
	TokenEndpoint {
		/// HTTP status returned by the endpoint.
		status: u16,
		/// Decoded response body carried for diagnosis.
		body: String,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint reported a non-positive lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}

/// Temporary failures that were retried up to the policy limit before surfacing.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Every attempt answered with a retryable status.
	#[error("Request still answered {status} after {attempts} attempts.")]
	RetriesExhausted {
		/// Final retryable status observed.
		status: u16,
		/// Attempts consumed, including the first.
		attempts: u32,
	},
	/// Every attempt failed at the connection level.
	#[error("Connection kept failing after {attempts} attempts.")]
	ConnectionFailed {
		/// Attempts consumed, including the first.
		attempts: u32,
		/// Final transport failure observed.
		#[source]
		source: BoxError,
	},
	/// Response body declared a compression it does not carry.
	#[error("Response body could not be decompressed.")]
	Decompress(#[from] std::io::Error),
}

/// Transport-level failures classified at the seam so the session can tell
/// fire-fail conditions apart from retryable ones.
#[derive(Debug, ThisError)]
pub enum TransportFailure {
	/// TLS negotiation failed; a policy problem, never retried.
	#[error("TLS negotiation failed: {message}.")]
	Tls {
		/// Transport-supplied failure description.
		message: String,
	},
	/// Proxy routing failed; a configuration problem, never retried.
	#[error("Proxy routing failed: {message}.")]
	Proxy {
		/// Transport-supplied failure description.
		message: String,
	},
	/// The attempt timed out; counted against the retry budget.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Connection could not be established or was reset; counted against the retry budget.
	#[error("Connection failed.")]
	Connect {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// I/O failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportFailure {
	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Timeout { source: Box::new(src) }
	}

	/// Wraps a transport-specific connection error.
	pub fn connect(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Connect { source: Box::new(src) }
	}

	/// Returns `true` when the failure indicates a policy/configuration problem that
	/// will not self-resolve, so the session must surface it without retry.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Tls { .. } | Self::Proxy { .. })
	}
}

/// Failures raised by [`KeyQuotaManager`](crate::keys::KeyQuotaManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum QuotaError {
	/// Every registered key reached its usage limit.
	#[error("All keys reached their usage limit.")]
	Exhausted,
}

/// Failures raised while persisting a downloaded body.
#[derive(Debug, ThisError)]
pub enum PersistenceError {
	/// Downloaded bytes could not be written to the requested path.
	#[error("Failed to write the downloaded body to {path}.")]
	Write {
		/// Destination the caller requested.
		path: PathBuf,
		/// Underlying filesystem failure.
		#[source]
		source: std::io::Error,
	},
}
