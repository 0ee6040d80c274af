//! Transport primitives behind the courier's single wire seam.
//!
//! The module exposes [`HttpTransport`] alongside [`WireRequest`] and [`WireResponse`] so
//! downstream crates can integrate custom HTTP stacks. One `send` call is one wire attempt:
//! retry policy, cookie replay, and backoff all live above this seam in
//! [`TransportSession`](crate::session::TransportSession). Implementations classify their
//! failures into [`TransportFailure`] so the session can tell fire-fail conditions (TLS,
//! proxy) apart from retryable ones (timeouts, resets).

// self
use crate::{_prelude::*, error::TransportFailure};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Default whole-attempt timeout applied by the bundled transport.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
/// Default connection-establishment timeout applied by the bundled transport.
pub const DEFAULT_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Abstraction over blocking HTTP stacks capable of executing one request/response exchange.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared, behind
/// `Arc<T>`, between the auth resolver, the session, and the proxy path without additional
/// wrappers. The call blocks the invoking thread for the duration of the round trip and must
/// enforce a bounded connect + read timeout so an attempt either completes or fails.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes a single wire attempt.
	fn send(&self, request: WireRequest) -> Result<WireResponse, TransportFailure>;
}

/// Fully described outbound request handed to a transport.
#[derive(Clone, Debug)]
pub struct WireRequest {
	/// HTTP method for the attempt.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Final header set, cookies and auth already applied.
	pub headers: HeaderMap,
	/// Optional request body bytes.
	pub body: Option<Vec<u8>>,
}

/// Raw response captured from a transport before any session-level processing.
#[derive(Clone, Debug)]
pub struct WireResponse {
	/// HTTP status answered by the server.
	pub status: StatusCode,
	/// Response headers, `Set-Cookie` values included.
	pub headers: HeaderMap,
	/// Raw body bytes, still compressed if the server compressed them.
	pub body: Vec<u8>,
}

/// Proxy routes keyed by target scheme, mirroring the `{http, https}` mapping callers supply.
#[derive(Clone, Debug, Default)]
pub struct ProxyRoutes {
	/// Proxy used for plain HTTP targets.
	pub http: Option<Url>,
	/// Proxy used for HTTPS targets.
	pub https: Option<Url>,
}
impl ProxyRoutes {
	/// Returns `true` when no route is configured.
	pub fn is_empty(&self) -> bool {
		self.http.is_none() && self.https.is_none()
	}
}

/// Thin wrapper around reqwest's blocking [`ReqwestClient`] so shared HTTP behavior lives in
/// one place. TLS is verified against the bundled trust roots; the client never follows
/// compression negotiation on its own, leaving `Content-Encoding` handling to the session.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with the default timeouts.
	pub fn new() -> Result<Self, ConfigError> {
		Self::with_timeouts(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
	}

	/// Builds a transport with caller-chosen attempt and connect timeouts.
	pub fn with_timeouts(
		timeout: StdDuration,
		connect_timeout: StdDuration,
	) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.connect_timeout(connect_timeout)
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	/// Wraps an existing blocking [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a proxy-routed transport for the courier's fire-once proxy path.
	pub fn proxied(
		routes: &ProxyRoutes,
		timeout: StdDuration,
		connect_timeout: StdDuration,
	) -> Result<Self, ConfigError> {
		let mut builder =
			ReqwestClient::builder().timeout(timeout).connect_timeout(connect_timeout);

		if let Some(url) = &routes.http {
			let proxy = reqwest::Proxy::http(url.as_str()).map_err(|source| {
				ConfigError::InvalidProxy { url: url.to_string(), source: Box::new(source) }
			})?;

			builder = builder.proxy(proxy);
		}
		if let Some(url) = &routes.https {
			let proxy = reqwest::Proxy::https(url.as_str()).map_err(|source| {
				ConfigError::InvalidProxy { url: url.to_string(), source: Box::new(source) }
			})?;

			builder = builder.proxy(proxy);
		}

		Ok(Self(builder.build().map_err(ConfigError::http_client_build)?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: WireRequest) -> Result<WireResponse, TransportFailure> {
		let mut builder = self.0.request(request.method, request.url).headers(request.headers);

		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		let response = builder.send().map_err(classify_reqwest_error)?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let body = response.bytes().map_err(classify_reqwest_error)?.to_vec();

		Ok(WireResponse { status, headers, body })
	}
}

#[cfg(feature = "reqwest")]
fn classify_reqwest_error(err: ReqwestError) -> TransportFailure {
	if is_tls_failure(&err) {
		return TransportFailure::Tls { message: err.to_string() };
	}
	if err.is_timeout() {
		return TransportFailure::timeout(err);
	}

	TransportFailure::connect(err)
}

// Reqwest does not classify TLS failures; walk the source chain the way its own error
// rendering does and match on the vocabulary rustls surfaces.
#[cfg(feature = "reqwest")]
fn is_tls_failure(err: &ReqwestError) -> bool {
	let mut current: Option<&dyn StdError> = Some(err);

	while let Some(inner) = current {
		let text = inner.to_string().to_lowercase();

		if text.contains("certificate") || text.contains("handshake") || text.contains("tls") {
			return true;
		}

		current = inner.source();
	}

	false
}
