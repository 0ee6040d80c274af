//! Header resolution for Basic, Bearer, and OAuth2 client-credentials modes.
//!
//! Basic and Bearer are pure header rewrites. OAuth2 performs network I/O only on a cache
//! miss or expiry: the refresh POST is the expensive step, and reusing the cached token is
//! the defining optimization of this module. The refresh goes directly through the transport
//! seam with a single attempt; token-endpoint rejections are authentication failures and are
//! never retried here.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
// self
use crate::{
	_prelude::*,
	auth::{AuthConfig, CachedToken, CredentialCache, OAuth2Config, SecretString},
	error::{AuthError, ConfigError},
	obs::{self, CallKind, CallOutcome},
	transport::{HttpTransport, WireRequest},
};

#[derive(Deserialize)]
struct TokenEndpointPayload {
	access_token: String,
	expires_in: i64,
}

/// Produces the `Authorization` header for the configured mode, refreshing OAuth2 tokens
/// through the transport seam when the cache is cold or expired.
pub struct AuthResolver<C>
where
	C: ?Sized + HttpTransport,
{
	config: Option<AuthConfig>,
	cache: CredentialCache,
	transport: Arc<C>,
}
impl<C> AuthResolver<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a resolver for the provided mode. `None` disables auth entirely.
	pub fn new(config: Option<AuthConfig>, transport: Arc<C>) -> Self {
		Self { config, cache: CredentialCache::default(), transport }
	}

	/// Returns an updated copy of `headers` with the `Authorization` header applied.
	///
	/// The caller-owned map is never mutated. Without an auth configuration the copy is
	/// returned unchanged.
	pub fn resolve(&self, headers: &HeaderMap) -> Result<HeaderMap> {
		let mut resolved = headers.clone();
		let Some(config) = &self.config else {
			return Ok(resolved);
		};
		let value = match config {
			AuthConfig::Basic { username, password } => {
				let encoded =
					BASE64_STANDARD.encode(format!("{username}:{}", password.expose()));

				format!("Basic {encoded}")
			},
			AuthConfig::Bearer { token } => format!("Bearer {}", token.expose()),
			AuthConfig::OAuth2(oauth) => {
				let token = self.current_token(oauth)?;

				format!("Bearer {}", token.expose())
			},
		};
		let mut value = HeaderValue::from_str(&value)
			.map_err(|_| ConfigError::UnrepresentableHeader { name: "Authorization" })?;

		value.set_sensitive(true);
		resolved.insert(AUTHORIZATION, value);

		Ok(resolved)
	}

	/// Returns the credential cache for inspection.
	pub fn cache(&self) -> &CredentialCache {
		&self.cache
	}

	fn current_token(&self, oauth: &OAuth2Config) -> Result<SecretString> {
		let now = OffsetDateTime::now_utc();

		if let Some(token) = self.cache.token_at(now) {
			return Ok(token);
		}

		obs::record_call_outcome(CallKind::TokenRefresh, CallOutcome::Attempt);

		let refreshed = self.refresh(oauth, now);

		match &refreshed {
			Ok(_) => obs::record_call_outcome(CallKind::TokenRefresh, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(CallKind::TokenRefresh, CallOutcome::Failure),
		}

		let fresh = refreshed?;
		let token = fresh.access_token.clone();

		self.cache.store(fresh);

		Ok(token)
	}

	fn refresh(&self, oauth: &OAuth2Config, now: OffsetDateTime) -> Result<CachedToken> {
		let body = url::form_urlencoded::Serializer::new(String::new())
			.append_pair("grant_type", "client_credentials")
			.append_pair("client_id", &oauth.client_id)
			.append_pair("client_secret", oauth.client_secret.expose())
			.append_pair("scope", &oauth.scope)
			.finish();
		let mut headers = HeaderMap::new();

		headers
			.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));

		let request = WireRequest {
			method: Method::POST,
			url: oauth.token_url.clone(),
			headers,
			body: Some(body.into_bytes()),
		};
		let response = self.transport.send(request)?;

		if !response.status.is_success() {
			return Err(AuthError::TokenEndpoint {
				status: response.status.as_u16(),
				body: String::from_utf8_lossy(&response.body).into_owned(),
			}
			.into());
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
		let payload: TokenEndpointPayload = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| AuthError::TokenResponseParse { source })?;

		if payload.expires_in <= 0 {
			return Err(AuthError::NonPositiveExpiresIn.into());
		}

		Ok(CachedToken {
			access_token: SecretString::new(payload.access_token),
			expires_at: now + Duration::seconds(payload.expires_in),
		})
	}
}
impl<C> Debug for AuthResolver<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthResolver")
			.field("config", &self.config)
			.field("cache", &self.cache)
			.finish()
	}
}
