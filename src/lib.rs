//! Layered blocking HTTP courier—auth resolution, retrying cookie sessions, and quota-aware key
//! rotation on one transport seam.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod error;
pub mod keys;
pub mod obs;
pub mod response;
pub mod session;
pub mod transport;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::{CourierBuilder, ReqwestCourier},
		session::RetryPolicy,
		transport::ReqwestTransport,
	};

	/// Builds a blocking transport with short timeouts suited to local mock servers.
	pub fn test_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.timeout(StdDuration::from_secs(5))
			.connect_timeout(StdDuration::from_secs(5))
			.build()
			.expect("Failed to build Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Courier builder preconfigured for mock-server tests: debug logging on, shared test
	/// transport, and a retry policy whose backoff never slows a suite down.
	pub fn test_courier(method: Method) -> CourierBuilder {
		ReqwestCourier::builder(method)
			.debug(true)
			.transport(test_transport())
			.retry_policy(RetryPolicy { backoff_factor: 0., ..Default::default() })
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use http::{
		HeaderMap, HeaderValue, Method, StatusCode,
		header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT},
	};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Error as ReqwestError, blocking::Client as ReqwestClient};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tempfile as _};
