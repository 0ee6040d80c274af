//! Content-negotiated response parsing.
//!
//! Parsing never fails outward: a body that does not match its declared content type is
//! converted into the degraded result (status 500, `"parse error"` text, no structured
//! value). Callers rely on always receiving a response-shaped value here, so the swallow
//! is an explicit contract rather than an error path.

// self
use crate::_prelude::*;

const PARSE_ERROR_TEXT: &str = "parse error";

#[derive(Debug, ThisError)]
enum ParseFailure {
	#[error("body is not valid UTF-8")]
	Utf8(#[from] std::string::FromUtf8Error),
	#[error("body is not valid JSON")]
	Json(#[from] serde_json::Error),
	#[error("body is not valid XML")]
	Xml(#[from] xmltree::ParseError),
}

/// Closed set of payload shapes produced by content negotiation.
#[derive(Clone, Debug)]
pub enum ResponseBody {
	/// `application/json` responses.
	Json {
		/// Decoded body text.
		text: String,
		/// Parsed JSON value.
		value: serde_json::Value,
	},
	/// `application/xml` and `text/xml` responses.
	Xml {
		/// Decoded body text.
		text: String,
		/// Parsed XML document root.
		document: xmltree::Element,
	},
	/// Other `text/*` responses.
	Text {
		/// Decoded body text.
		text: String,
	},
	/// Responses with no matching textual content type.
	Bytes {
		/// Raw body bytes.
		bytes: Vec<u8>,
	},
}

/// Response parsed by declared content type; ownership transfers to the caller.
#[derive(Clone, Debug)]
pub struct ParsedResponse {
	/// HTTP status, or 500 for the degraded parse-failure result.
	pub status: u16,
	/// Parsed payload.
	pub body: ResponseBody,
}
impl ParsedResponse {
	/// Parses `body` according to the `Content-Type` declared in `headers`.
	pub fn from_parts(status: u16, headers: &HeaderMap, body: Vec<u8>) -> Self {
		let content_type = headers
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default()
			.to_ascii_lowercase();

		match parse_body(&content_type, body) {
			Ok(parsed) => Self { status, body: parsed },
			Err(failure) => {
				tracing::debug!(status, %failure, "response parse failed; degrading");

				Self::degraded()
			},
		}
	}

	/// The fixed result substituted when parsing fails.
	pub fn degraded() -> Self {
		Self { status: 500, body: ResponseBody::Text { text: PARSE_ERROR_TEXT.into() } }
	}

	/// Returns the decoded text for textual payloads.
	pub fn text(&self) -> Option<&str> {
		match &self.body {
			ResponseBody::Json { text, .. }
			| ResponseBody::Xml { text, .. }
			| ResponseBody::Text { text } => Some(text),
			ResponseBody::Bytes { .. } => None,
		}
	}

	/// Returns the parsed JSON value, if this is a JSON payload.
	pub fn json(&self) -> Option<&serde_json::Value> {
		match &self.body {
			ResponseBody::Json { value, .. } => Some(value),
			_ => None,
		}
	}

	/// Returns the parsed XML document, if this is an XML payload.
	pub fn xml(&self) -> Option<&xmltree::Element> {
		match &self.body {
			ResponseBody::Xml { document, .. } => Some(document),
			_ => None,
		}
	}

	/// Returns the raw bytes, if no textual content type matched.
	pub fn bytes(&self) -> Option<&[u8]> {
		match &self.body {
			ResponseBody::Bytes { bytes } => Some(bytes),
			_ => None,
		}
	}
}

fn parse_body(content_type: &str, body: Vec<u8>) -> Result<ResponseBody, ParseFailure> {
	if content_type.contains("application/json") {
		let text = String::from_utf8(body)?;
		let value = serde_json::from_str(&text)?;

		return Ok(ResponseBody::Json { text, value });
	}
	if content_type.contains("application/xml") || content_type.contains("text/xml") {
		let text = String::from_utf8(body)?;
		let document = xmltree::Element::parse(text.as_bytes())?;

		return Ok(ResponseBody::Xml { text, document });
	}
	if content_type.contains("text/") {
		return Ok(ResponseBody::Text { text: String::from_utf8(body)? });
	}

	Ok(ResponseBody::Bytes { bytes: body })
}
