//! Immutable authentication configuration selected at client construction time.

// self
use crate::{_prelude::*, auth::SecretString, error::ConfigError};

/// Authentication mode applied to every request issued by a courier.
///
/// Selected once at construction; the resolver never mutates it. Use the constructor
/// helpers so malformed credentials surface as [`ConfigError`]s instead of failing at
/// request time.
#[derive(Clone, Debug)]
pub enum AuthConfig {
	/// `Authorization: Basic base64(username:password)`.
	Basic {
		/// Account name; must not contain `:`.
		username: String,
		/// Account password.
		password: SecretString,
	},
	/// `Authorization: Bearer <token>` with a static token.
	Bearer {
		/// Static bearer token.
		token: SecretString,
	},
	/// OAuth2 client-credentials grant with cached access tokens.
	OAuth2(OAuth2Config),
}
impl AuthConfig {
	/// Builds a validated Basic configuration.
	pub fn basic(
		username: impl Into<String>,
		password: impl Into<SecretString>,
	) -> Result<Self, ConfigError> {
		let username = username.into();

		if username.contains(':') {
			return Err(ConfigError::MalformedBasicCredentials);
		}

		Ok(Self::Basic { username, password: password.into() })
	}

	/// Builds a static Bearer configuration.
	pub fn bearer(token: impl Into<SecretString>) -> Self {
		Self::Bearer { token: token.into() }
	}

	/// Builds an OAuth2 client-credentials configuration.
	pub fn oauth2(config: OAuth2Config) -> Self {
		Self::OAuth2(config)
	}
}

/// Parameters for the OAuth2 client-credentials token exchange.
#[derive(Clone, Debug)]
pub struct OAuth2Config {
	/// Token endpoint receiving the form-encoded grant request.
	pub token_url: Url,
	/// OAuth2 client identifier.
	pub client_id: String,
	/// OAuth2 client secret.
	pub client_secret: SecretString,
	/// Space-delimited scope string; sent even when empty.
	pub scope: String,
}
impl OAuth2Config {
	/// Creates a configuration with an empty scope.
	pub fn new(
		token_url: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<SecretString>,
	) -> Self {
		Self {
			token_url,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			scope: String::new(),
		}
	}

	/// Overrides the requested scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}
}
