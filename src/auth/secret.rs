//! Redacting wrapper for credential material.

// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping passwords, tokens, and key values out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretString(String);
impl SecretString {
	/// Wraps a new secret value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for SecretString {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for SecretString {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SecretString").field(&"<redacted>").finish()
	}
}
impl Display for SecretString {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
