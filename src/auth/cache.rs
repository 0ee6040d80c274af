//! Single-token credential cache with time-based invalidation.

// self
use crate::{_prelude::*, auth::SecretString};

/// Most recently acquired OAuth2 access token and its expiry instant.
#[derive(Clone, Debug)]
pub struct CachedToken {
	/// Access token returned by the token endpoint.
	pub access_token: SecretString,
	/// Cache-write instant plus the provider-reported lifetime.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Returns `true` while the token may still be presented upstream.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}

/// Holds at most one [`CachedToken`] per resolver instance.
///
/// Reads and writes each take the lock once; concurrent refreshers that both observed a cold
/// cache may race, and the last write wins with the same semantic result. That duplicate
/// refresh is tolerated by design, so no single-flight guard exists here.
#[derive(Debug, Default)]
pub struct CredentialCache(Mutex<Option<CachedToken>>);
impl CredentialCache {
	/// Returns the cached token when it is still usable at `instant`.
	pub fn token_at(&self, instant: OffsetDateTime) -> Option<SecretString> {
		self.0
			.lock()
			.as_ref()
			.filter(|token| token.is_usable_at(instant))
			.map(|token| token.access_token.clone())
	}

	/// Replaces the cached token.
	pub fn store(&self, token: CachedToken) {
		*self.0.lock() = Some(token);
	}

	/// Drops the cached token, forcing the next resolution to refresh.
	pub fn clear(&self) {
		*self.0.lock() = None;
	}

	/// Returns the expiry instant of the cached token, if any. Intended for inspection.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.0.lock().as_ref().map(|token| token.expires_at)
	}
}
