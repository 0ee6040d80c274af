//! Blocking transport session: cookie replay, retrying dispatch, cookie capture, downloads.

pub mod cookie;
pub mod retry;

pub use cookie::*;
pub use retry::*;

// std
use std::{
	fs,
	io::Read,
	path::{Path, PathBuf},
	thread,
};
// crates.io
use flate2::read::{GzDecoder, ZlibDecoder};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, PersistenceError, TransientError},
	transport::{HttpTransport, WireRequest, WireResponse},
};

/// In-memory session response; the body is already decompressed.
#[derive(Clone, Debug)]
pub struct SessionResponse {
	/// HTTP status of the final attempt.
	pub status: u16,
	/// Response headers of the final attempt.
	pub headers: HeaderMap,
	/// Body bytes after `Content-Encoding` handling.
	pub body: Vec<u8>,
}
impl SessionResponse {
	/// Returns the body decoded as UTF-8, lossily.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Returns the declared content type, lowercased.
	pub fn content_type(&self) -> Option<String> {
		self.headers
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(str::to_ascii_lowercase)
	}
}

/// Receipt for a body streamed to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadReceipt {
	/// HTTP status of the final attempt.
	pub status: u16,
	/// Path the body was written to.
	pub path: PathBuf,
}

/// Result of a session execution that may have been diverted to disk.
#[derive(Clone, Debug)]
pub enum SessionReply {
	/// The body stayed in memory.
	Response(SessionResponse),
	/// The body was written to the requested path.
	Downloaded(DownloadReceipt),
}

/// Owns a cookie store and a retry policy around one shared transport.
///
/// `execute` is synchronous from the caller's perspective: the calling thread blocks through
/// every attempt and backoff sleep, and there are no partial results. Cookie reads observe
/// cookies written by prior completed calls on the same session.
pub struct TransportSession<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	policy: RetryPolicy,
	cookies: CookieStore,
}
impl<C> TransportSession<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a session over `transport` with the provided policy.
	pub fn new(transport: Arc<C>, policy: RetryPolicy) -> Self {
		Self { transport, policy, cookies: CookieStore::default() }
	}

	/// Returns the session cookie store.
	pub fn cookies(&self) -> &CookieStore {
		&self.cookies
	}

	/// Returns the session retry policy.
	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Executes one request and returns the in-memory response.
	pub fn execute(
		&self,
		method: Method,
		url: &Url,
		headers: HeaderMap,
		body: Option<Vec<u8>>,
	) -> Result<SessionResponse> {
		let response = self.run(method, url, headers, body)?;

		into_session_response(response)
	}

	/// Executes one request, streaming the body to `path` when the method is `GET` and the
	/// status is exactly 200; any other outcome falls back to the in-memory reply.
	///
	/// A filesystem failure while writing is a [`PersistenceError`], reported independently
	/// of transport success.
	pub fn download(
		&self,
		method: Method,
		url: &Url,
		headers: HeaderMap,
		body: Option<Vec<u8>>,
		path: &Path,
	) -> Result<SessionReply> {
		let downloadable = method == Method::GET;
		let response = self.run(method, url, headers, body)?;

		if downloadable && response.status.as_u16() == 200 {
			fs::write(path, &response.body).map_err(|source| PersistenceError::Write {
				path: path.to_owned(),
				source,
			})?;

			return Ok(SessionReply::Downloaded(DownloadReceipt {
				status: response.status.as_u16(),
				path: path.to_owned(),
			}));
		}

		Ok(SessionReply::Response(into_session_response(response)?))
	}

	fn run(
		&self,
		method: Method,
		url: &Url,
		mut headers: HeaderMap,
		body: Option<Vec<u8>>,
	) -> Result<WireResponse> {
		if let Some(cookie_header) = self.cookies.header_for(url) {
			let value = HeaderValue::from_str(&cookie_header)
				.map_err(|_| ConfigError::UnrepresentableHeader { name: "Cookie" })?;

			headers.insert(COOKIE, value);
		}

		let request = WireRequest { method: method.clone(), url: url.clone(), headers, body };
		let max_attempts = self.policy.max_retries.saturating_add(1);
		let mut attempt = 1_u32;

		loop {
			match self.transport.send(request.clone()) {
				Ok(response) => {
					// Capture cookies on every response, retried ones included.
					self.cookies.absorb(url, &response.headers);

					if !self.policy.should_retry(response.status, &method) {
						return Ok(response);
					}
					if attempt >= max_attempts {
						return Err(TransientError::RetriesExhausted {
							status: response.status.as_u16(),
							attempts: attempt,
						}
						.into());
					}
				},
				Err(failure) if failure.is_fatal() => return Err(failure.into()),
				Err(failure) =>
					if attempt >= max_attempts {
						return Err(TransientError::ConnectionFailed {
							attempts: attempt,
							source: Box::new(failure),
						}
						.into());
					},
			}

			thread::sleep(self.policy.backoff_delay(attempt));

			attempt += 1;
		}
	}
}
impl<C> Debug for TransportSession<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TransportSession")
			.field("policy", &self.policy)
			.field("cookies", &self.cookies)
			.finish()
	}
}

fn into_session_response(response: WireResponse) -> Result<SessionResponse> {
	let body = decode_body(&response.headers, response.body)?;

	Ok(SessionResponse { status: response.status.as_u16(), headers: response.headers, body })
}

/// Undoes a declared `Content-Encoding` of `gzip` or `deflate`; other declarations and
/// unencoded bodies pass through untouched.
pub(crate) fn decode_body(
	headers: &HeaderMap,
	body: Vec<u8>,
) -> Result<Vec<u8>, TransientError> {
	let encoding = headers
		.get(CONTENT_ENCODING)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default()
		.trim()
		.to_ascii_lowercase();

	match encoding.as_str() {
		"gzip" => {
			let mut decoded = Vec::new();

			GzDecoder::new(body.as_slice()).read_to_end(&mut decoded)?;

			Ok(decoded)
		},
		"deflate" => {
			let mut decoded = Vec::new();

			ZlibDecoder::new(body.as_slice()).read_to_end(&mut decoded)?;

			Ok(decoded)
		},
		_ => Ok(body),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicU32, Ordering},
	};
	// crates.io
	use flate2::{Compression, write::GzEncoder};
	// self
	use super::*;
	use crate::error::{Error, TransportFailure};

	struct ScriptedTransport {
		replies: Mutex<VecDeque<Result<WireResponse, TransportFailure>>>,
		calls: AtomicU32,
	}
	impl ScriptedTransport {
		fn new(
			replies: impl IntoIterator<Item = Result<WireResponse, TransportFailure>>,
		) -> Arc<Self> {
			Arc::new(Self {
				replies: Mutex::new(replies.into_iter().collect()),
				calls: AtomicU32::new(0),
			})
		}

		fn calls(&self) -> u32 {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, _: WireRequest) -> Result<WireResponse, TransportFailure> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.replies.lock().pop_front().expect("Scripted transport ran out of replies.")
		}
	}

	fn reply(status: u16, headers: HeaderMap, body: &[u8]) -> Result<WireResponse, TransportFailure> {
		Ok(WireResponse {
			status: StatusCode::from_u16(status).expect("Test status should be valid."),
			headers,
			body: body.to_vec(),
		})
	}

	fn fast_policy() -> RetryPolicy {
		RetryPolicy { backoff_factor: 0., ..Default::default() }
	}

	fn url(text: &str) -> Url {
		Url::parse(text).expect("Session test URL should parse.")
	}

	#[test]
	fn retryable_statuses_are_retried_until_success() {
		let transport = ScriptedTransport::new([
			reply(503, HeaderMap::new(), b""),
			reply(503, HeaderMap::new(), b""),
			reply(200, HeaderMap::new(), b"ok"),
		]);
		let session = TransportSession::new(transport.clone(), fast_policy());
		let response = session
			.execute(Method::GET, &url("https://api.test/"), HeaderMap::new(), None)
			.expect("Third attempt should succeed.");

		assert_eq!(response.status, 200);
		assert_eq!(response.body, b"ok");
		assert_eq!(transport.calls(), 3);
	}

	#[test]
	fn exhausted_retries_surface_a_transient_error() {
		let transport = ScriptedTransport::new([
			reply(503, HeaderMap::new(), b""),
			reply(503, HeaderMap::new(), b""),
			reply(503, HeaderMap::new(), b""),
			reply(503, HeaderMap::new(), b""),
		]);
		let session = TransportSession::new(transport.clone(), fast_policy());
		let err = session
			.execute(Method::GET, &url("https://api.test/"), HeaderMap::new(), None)
			.expect_err("Permanent 503 should exhaust the retry budget.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::RetriesExhausted { status: 503, attempts: 4 }),
		));
		assert_eq!(transport.calls(), 4);
	}

	#[test]
	fn non_retryable_methods_return_the_first_answer() {
		let transport = ScriptedTransport::new([reply(503, HeaderMap::new(), b"busy")]);
		let session = TransportSession::new(transport.clone(), fast_policy());
		let response = session
			.execute(Method::HEAD, &url("https://api.test/"), HeaderMap::new(), None)
			.expect("HEAD is not retryable and should pass the 503 through.");

		assert_eq!(response.status, 503);
		assert_eq!(transport.calls(), 1);
	}

	#[test]
	fn tls_failures_surface_immediately() {
		let transport = ScriptedTransport::new([Err(TransportFailure::Tls {
			message: "bad certificate".into(),
		})]);
		let session = TransportSession::new(transport.clone(), fast_policy());
		let err = session
			.execute(Method::GET, &url("https://api.test/"), HeaderMap::new(), None)
			.expect_err("TLS failures must not be retried.");

		assert!(matches!(err, Error::Transport(TransportFailure::Tls { .. })));
		assert_eq!(transport.calls(), 1);
	}

	#[test]
	fn connection_failures_consume_the_same_budget() {
		let transport = ScriptedTransport::new([
			Err(TransportFailure::connect(std::io::Error::other("reset"))),
			Err(TransportFailure::connect(std::io::Error::other("reset"))),
			reply(200, HeaderMap::new(), b"ok"),
		]);
		let session = TransportSession::new(transport.clone(), fast_policy());
		let response = session
			.execute(Method::GET, &url("https://api.test/"), HeaderMap::new(), None)
			.expect("Connection resets within the budget should recover.");

		assert_eq!(response.status, 200);
		assert_eq!(transport.calls(), 3);
	}

	#[test]
	fn cookies_round_trip_across_calls() {
		let mut set_cookie_headers = HeaderMap::new();

		set_cookie_headers.append(SET_COOKIE, HeaderValue::from_static("sid=abc"));

		let transport = ScriptedTransport::new([
			reply(200, set_cookie_headers, b""),
			reply(200, HeaderMap::new(), b""),
		]);
		let session = TransportSession::new(transport, fast_policy());
		let target = url("https://api.test/login");

		session
			.execute(Method::GET, &target, HeaderMap::new(), None)
			.expect("Cookie-setting call should succeed.");

		assert_eq!(session.cookies().header_for(&target), Some("sid=abc".to_owned()));
	}

	#[test]
	fn gzip_bodies_are_decompressed() {
		use std::io::Write;

		let mut encoder = GzEncoder::new(Vec::new(), Compression::default());

		encoder.write_all(b"hello gzip").expect("Gzip fixture should encode.");

		let compressed = encoder.finish().expect("Gzip fixture should finish.");
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));

		let transport =
			ScriptedTransport::new([reply(200, headers, &compressed)]);
		let session = TransportSession::new(transport, fast_policy());
		let response = session
			.execute(Method::GET, &url("https://api.test/"), HeaderMap::new(), None)
			.expect("Gzip response should decode.");

		assert_eq!(response.body, b"hello gzip");
		assert_eq!(response.text(), "hello gzip");
	}

	#[test]
	fn download_writes_the_exact_body() {
		let dir = tempfile::tempdir().expect("Temp dir should be creatable.");
		let path = dir.path().join("body.bin");
		let transport = ScriptedTransport::new([reply(200, HeaderMap::new(), b"hello")]);
		let session = TransportSession::new(transport, fast_policy());
		let reply = session
			.download(Method::GET, &url("https://api.test/file"), HeaderMap::new(), None, &path)
			.expect("Download should succeed.");

		match reply {
			SessionReply::Downloaded(receipt) => {
				assert_eq!(receipt.status, 200);
				assert_eq!(receipt.path, path);
			},
			SessionReply::Response(_) => panic!("A 200 GET with a path must divert to disk."),
		}

		assert_eq!(fs::read(&path).expect("Downloaded file should exist."), b"hello");
	}

	#[test]
	fn non_200_downloads_fall_back_to_memory() {
		let dir = tempfile::tempdir().expect("Temp dir should be creatable.");
		let path = dir.path().join("missing.bin");
		let transport = ScriptedTransport::new([reply(404, HeaderMap::new(), b"nope")]);
		let session = TransportSession::new(transport, fast_policy());
		let reply = session
			.download(Method::GET, &url("https://api.test/file"), HeaderMap::new(), None, &path)
			.expect("Non-200 download should fall back to the in-memory reply.");

		assert!(matches!(reply, SessionReply::Response(ref response) if response.status == 404));
		assert!(!path.exists());
	}

	#[test]
	fn unwritable_download_paths_report_persistence_errors() {
		let transport = ScriptedTransport::new([reply(200, HeaderMap::new(), b"hello")]);
		let session = TransportSession::new(transport, fast_policy());
		let err = session
			.download(
				Method::GET,
				&url("https://api.test/file"),
				HeaderMap::new(),
				None,
				Path::new("/nonexistent-dir/body.bin"),
			)
			.expect_err("Writing into a missing directory should fail.");

		assert!(matches!(err, Error::Persistence(PersistenceError::Write { .. })));
	}
}
