//! Per-session cookie store with coarse domain matching.

// self
use crate::_prelude::*;

/// One cookie captured from a `Set-Cookie` response header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
	/// Cookie name.
	pub name: String,
	/// Cookie value.
	pub value: String,
	/// Domain the cookie was scoped to, either declared or the responding host.
	pub domain: String,
}

/// Session cookie store keyed by `(domain, name)` with last-write-wins semantics.
///
/// Replay matching is substring containment of the stored domain in the request host.
/// That is deliberately coarser than RFC 6265 scoping and is kept as documented behavior;
/// the same containment test gates which `Set-Cookie` domains are accepted at capture time.
#[derive(Debug, Default)]
pub struct CookieStore(RwLock<BTreeMap<(String, String), String>>);
impl CookieStore {
	/// Builds the `Cookie` header value for `url`: matching `name=value` pairs joined by `; `.
	pub fn header_for(&self, url: &Url) -> Option<String> {
		let host = url.host_str()?;
		let guard = self.0.read();
		let pairs = guard
			.iter()
			.filter(|((domain, _), _)| host.contains(domain.as_str()))
			.map(|((_, name), value)| format!("{name}={value}"))
			.collect::<Vec<_>>();

		if pairs.is_empty() { None } else { Some(pairs.join("; ")) }
	}

	/// Upserts every `Set-Cookie` header of a response against the request URL.
	///
	/// Runs on every response regardless of status. Cookies whose declared domain is not
	/// contained in the responding host are dropped.
	pub fn absorb(&self, url: &Url, headers: &HeaderMap) {
		let Some(host) = url.host_str() else {
			return;
		};
		let mut guard = self.0.write();

		for value in headers.get_all(SET_COOKIE) {
			let Ok(text) = value.to_str() else {
				continue;
			};
			let Some(record) = parse_set_cookie(text, host) else {
				continue;
			};

			guard.insert((record.domain, record.name), record.value);
		}
	}

	/// Returns every stored cookie as a record list.
	pub fn records(&self) -> Vec<CookieRecord> {
		self.0
			.read()
			.iter()
			.map(|((domain, name), value)| CookieRecord {
				name: name.clone(),
				value: value.clone(),
				domain: domain.clone(),
			})
			.collect()
	}

	/// Clears every stored cookie.
	pub fn clear(&self) {
		self.0.write().clear();
	}
}

fn parse_set_cookie(header: &str, request_host: &str) -> Option<CookieRecord> {
	let mut parts = header.split(';');
	let (name, value) = parts.next()?.split_once('=')?;
	let name = name.trim();
	let value = value.trim();

	if name.is_empty() {
		return None;
	}

	let mut domain = request_host.to_ascii_lowercase();

	for attribute in parts {
		let Some((key, declared)) = attribute.split_once('=') else {
			continue;
		};

		if key.trim().eq_ignore_ascii_case("domain") {
			domain = declared.trim().trim_start_matches('.').to_ascii_lowercase();
		}
	}
	if !request_host.to_ascii_lowercase().contains(&domain) {
		return None;
	}

	Some(CookieRecord { name: name.into(), value: value.into(), domain })
}
