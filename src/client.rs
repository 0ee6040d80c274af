//! Request orchestration: header assembly, auth resolution, URL building, routing, parsing.

// std
use std::path::Path;
// self
use crate::{
	_prelude::*,
	auth::{AuthConfig, AuthResolver},
	error::{ConfigError, TransportFailure},
	obs::{self, CallKind, CallOutcome},
	response::ParsedResponse,
	session::{RetryPolicy, SessionReply, SessionResponse, TransportSession},
	transport::{HttpTransport, WireRequest},
};
#[cfg(feature = "reqwest")]
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, ProxyRoutes, ReqwestTransport};

/// `User-Agent` sent when the caller does not configure one.
pub const DEFAULT_USER_AGENT: &str = concat!("http-courier/", env!("CARGO_PKG_VERSION"));

/// Caller-supplied intent for one call; immutable once handed to the courier.
#[derive(Clone, Debug)]
pub struct RequestIntent {
	/// Target URL text; may already carry query parameters.
	pub url: String,
	/// Extra headers for this call.
	pub headers: HeaderMap,
	/// Optional body bytes.
	pub body: Option<Vec<u8>>,
	/// Query parameters merged into the URL; repeated keys are preserved.
	pub params: Vec<(String, String)>,
	/// Overrides the courier's default method for this call.
	pub method: Option<Method>,
}
impl RequestIntent {
	/// Creates an intent for the provided URL.
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			headers: HeaderMap::new(),
			body: None,
			params: Vec::new(),
			method: None,
		}
	}

	/// Overrides the method for this call.
	pub fn with_method(mut self, method: Method) -> Self {
		self.method = Some(method);

		self
	}

	/// Replaces the extra headers for this call.
	pub fn with_headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;

		self
	}

	/// Sets the request body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Appends one query parameter; repeat a key to send it multiple times.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}
}

/// Merges `params` into `url`'s query string.
///
/// Existing parameters are preserved; a key that also appears in `params` has its values
/// replaced wholesale by the caller's, and keys new to the URL append in caller order.
/// Repeated keys serialize as repeated pairs.
pub fn build_url(url: &str, params: &[(String, String)]) -> Result<Url, ConfigError> {
	let mut parsed = Url::parse(url)
		.map_err(|source| ConfigError::InvalidUrl { url: url.to_owned(), source })?;

	if params.is_empty() {
		return Ok(parsed);
	}

	let mut merged: Vec<(String, Vec<String>)> = Vec::new();

	for (key, value) in parsed.query_pairs() {
		match merged.iter_mut().find(|(existing, _)| *existing == key) {
			Some((_, values)) => values.push(value.into_owned()),
			None => merged.push((key.into_owned(), vec![value.into_owned()])),
		}
	}

	let mut replaced: Vec<&str> = Vec::new();

	for (key, value) in params {
		match merged.iter_mut().find(|(existing, _)| existing == key) {
			Some((_, values)) =>
				if replaced.contains(&key.as_str()) {
					values.push(value.clone());
				} else {
					*values = vec![value.clone()];

					replaced.push(key);
				},
			None => {
				merged.push((key.clone(), vec![value.clone()]));
				replaced.push(key);
			},
		}
	}

	let mut serializer = url::form_urlencoded::Serializer::new(String::new());

	for (key, values) in &merged {
		for value in values {
			serializer.append_pair(key, value);
		}
	}

	parsed.set_query(Some(&serializer.finish()));

	Ok(parsed)
}

/// Composes the resolver, the session, and the optional proxy route into one client.
///
/// Every call runs the same strict sequence: assemble headers, resolve auth, build the
/// final URL, route (proxy or session), parse by content type. All state that outlives a
/// call (token cache, cookie store) is per-courier, so independently configured couriers
/// coexist without sharing anything.
pub struct Courier<C>
where
	C: ?Sized + HttpTransport,
{
	method: Method,
	user_agent: String,
	debug: bool,
	resolver: AuthResolver<C>,
	session: TransportSession<C>,
	proxy: Option<Arc<C>>,
}
#[cfg(feature = "reqwest")]
/// Courier specialized for the crate's bundled reqwest transport.
pub type ReqwestCourier = Courier<ReqwestTransport>;

impl<C> Courier<C>
where
	C: ?Sized + HttpTransport,
{
	/// Assembles a courier from explicit parts; the escape hatch for custom transports.
	///
	/// `proxy` is the fire-once transport used instead of the retrying session whenever it
	/// is present.
	pub fn from_parts(
		transport: Arc<C>,
		proxy: Option<Arc<C>>,
		method: Method,
		user_agent: impl Into<String>,
		debug: bool,
		auth: Option<AuthConfig>,
		policy: RetryPolicy,
	) -> Self {
		Self {
			method,
			user_agent: user_agent.into(),
			debug,
			resolver: AuthResolver::new(auth, transport.clone()),
			session: TransportSession::new(transport, policy),
			proxy,
		}
	}

	/// Executes a fully described request and parses the response by content type.
	pub fn request(&self, intent: RequestIntent) -> Result<ParsedResponse> {
		obs::record_call_outcome(CallKind::Request, CallOutcome::Attempt);

		let result = self.dispatch(intent).map(|response| {
			ParsedResponse::from_parts(response.status, &response.headers, response.body)
		});

		match &result {
			Ok(_) => obs::record_call_outcome(CallKind::Request, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(CallKind::Request, CallOutcome::Failure),
		}

		result
	}

	/// Executes a GET for `intent` and streams a 200 body to `path`.
	///
	/// Any other status falls back to the in-memory reply. Downloads always route through
	/// the session; a configured proxy does not apply to them.
	pub fn download(&self, intent: RequestIntent, path: &Path) -> Result<SessionReply> {
		obs::record_call_outcome(CallKind::Download, CallOutcome::Attempt);

		let (url, headers, body) = self.prepare(&Method::GET, intent)?;
		let result = self.session.download(Method::GET, &url, headers, body, path);

		match &result {
			Ok(_) => obs::record_call_outcome(CallKind::Download, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(CallKind::Download, CallOutcome::Failure),
		}

		result
	}

	/// Returns the transport session, exposing the cookie store and retry policy.
	pub fn session(&self) -> &TransportSession<C> {
		&self.session
	}

	/// Returns the auth resolver, exposing the credential cache.
	pub fn resolver(&self) -> &AuthResolver<C> {
		&self.resolver
	}

	fn dispatch(&self, intent: RequestIntent) -> Result<SessionResponse> {
		let method = intent.method.clone().unwrap_or_else(|| self.method.clone());
		let (url, headers, body) = self.prepare(&method, intent)?;

		if let Some(proxy) = &self.proxy {
			// Fire-once: proxy routing bypasses the retrying session entirely.
			let request = WireRequest { method, url, headers, body };
			let response = proxy.send(request).map_err(as_proxy_failure)?;
			let body = crate::session::decode_body(&response.headers, response.body)?;

			return Ok(SessionResponse {
				status: response.status.as_u16(),
				headers: response.headers,
				body,
			});
		}

		self.session.execute(method, &url, headers, body)
	}

	fn prepare(
		&self,
		method: &Method,
		intent: RequestIntent,
	) -> Result<(Url, HeaderMap, Option<Vec<u8>>)> {
		let mut headers = intent.headers;
		// The configured agent string always wins, caller-supplied values included.
		let agent = HeaderValue::from_str(&self.user_agent)
			.map_err(|_| ConfigError::UnrepresentableHeader { name: "User-Agent" })?;

		headers.insert(USER_AGENT, agent);

		let headers = self.resolver.resolve(&headers)?;
		let url = build_url(&intent.url, &intent.params)?;

		if self.debug {
			obs::log_request(method, &url, &intent.params, &headers);
		}

		Ok((url, headers, intent.body))
	}
}
impl<C> Debug for Courier<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Courier")
			.field("method", &self.method)
			.field("user_agent", &self.user_agent)
			.field("debug", &self.debug)
			.field("proxied", &self.proxy.is_some())
			.finish()
	}
}
#[cfg(feature = "reqwest")]
impl ReqwestCourier {
	/// Returns a builder for the bundled reqwest transport stack.
	pub fn builder(method: Method) -> CourierBuilder {
		CourierBuilder::new(method)
	}
}

fn as_proxy_failure(failure: TransportFailure) -> Error {
	match failure {
		fatal @ (TransportFailure::Tls { .. } | TransportFailure::Proxy { .. }) => fatal.into(),
		other => TransportFailure::Proxy { message: other.to_string() }.into(),
	}
}

/// Builder for [`ReqwestCourier`] values.
#[cfg(feature = "reqwest")]
#[derive(Debug)]
pub struct CourierBuilder {
	method: Method,
	debug: bool,
	user_agent: Option<String>,
	proxies: ProxyRoutes,
	auth: Option<AuthConfig>,
	policy: RetryPolicy,
	timeout: StdDuration,
	connect_timeout: StdDuration,
	transport: Option<ReqwestTransport>,
}
#[cfg(feature = "reqwest")]
impl CourierBuilder {
	fn new(method: Method) -> Self {
		Self {
			method,
			debug: false,
			user_agent: None,
			proxies: ProxyRoutes::default(),
			auth: None,
			policy: RetryPolicy::default(),
			timeout: DEFAULT_TIMEOUT,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			transport: None,
		}
	}

	/// Enables the redacted debug side channel.
	pub fn debug(mut self, debug: bool) -> Self {
		self.debug = debug;

		self
	}

	/// Overrides the `User-Agent` string applied to every call.
	pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
		self.user_agent = Some(agent.into());

		self
	}

	/// Routes calls through the provided proxies instead of the retrying session.
	pub fn proxies(mut self, routes: ProxyRoutes) -> Self {
		self.proxies = routes;

		self
	}

	/// Sets the authentication mode.
	pub fn auth(mut self, config: AuthConfig) -> Self {
		self.auth = Some(config);

		self
	}

	/// Overrides the session retry policy.
	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Overrides the per-attempt and connect timeouts.
	pub fn timeouts(mut self, timeout: StdDuration, connect_timeout: StdDuration) -> Self {
		self.timeout = timeout;
		self.connect_timeout = connect_timeout;

		self
	}

	/// Supplies a prebuilt transport instead of constructing one.
	pub fn transport(mut self, transport: ReqwestTransport) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Builds the courier, constructing transports as needed.
	pub fn build(self) -> Result<ReqwestCourier> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => ReqwestTransport::with_timeouts(self.timeout, self.connect_timeout)?,
		};
		let proxy = if self.proxies.is_empty() {
			None
		} else {
			Some(Arc::new(ReqwestTransport::proxied(
				&self.proxies,
				self.timeout,
				self.connect_timeout,
			)?))
		};

		Ok(Courier::from_parts(
			Arc::new(transport),
			proxy,
			self.method,
			self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
			self.debug,
			self.auth,
			self.policy,
		))
	}
}
