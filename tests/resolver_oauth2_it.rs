// std
use std::sync::Arc;
// crates.io
use http::HeaderMap;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use http_courier::{
	auth::{AuthConfig, AuthResolver, CachedToken, OAuth2Config, SecretString},
	error::{AuthError, Error},
	transport::ReqwestTransport,
};

fn oauth2_resolver(server: &MockServer) -> AuthResolver<ReqwestTransport> {
	let token_url = Url::parse(&server.url("/token"))
		.expect("Mock token endpoint URL should parse.");
	let config =
		OAuth2Config::new(token_url, "client-1", "confidential").with_scope("api.read");
	let transport =
		Arc::new(ReqwestTransport::new().expect("Test transport should build."));

	AuthResolver::new(Some(AuthConfig::oauth2(config)), transport)
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
	headers.get(http::header::AUTHORIZATION).and_then(|value| value.to_str().ok())
}

#[test]
fn resolve_reuses_the_cached_token_within_its_window() {
	let server = MockServer::start();
	let mock = server.mock(|when, then| {
		when.method(POST).path("/token");
		then.status(200).header("content-type", "application/json").body(
			"{\"access_token\":\"cached-token\",\"token_type\":\"bearer\",\"expires_in\":1800}",
		);
	});
	let resolver = oauth2_resolver(&server);
	let first = resolver
		.resolve(&HeaderMap::new())
		.expect("Initial resolution should fetch a token.");
	let second = resolver
		.resolve(&HeaderMap::new())
		.expect("Cached resolution should succeed without another fetch.");

	assert_eq!(authorization(&first), Some("Bearer cached-token"));
	assert_eq!(authorization(&second), Some("Bearer cached-token"));

	mock.assert_calls(1);
}

#[test]
fn resolve_refreshes_exactly_once_after_expiry() {
	let server = MockServer::start();
	let mock = server.mock(|when, then| {
		when.method(POST).path("/token");
		then.status(200).header("content-type", "application/json").body(
			"{\"access_token\":\"fresh-token\",\"token_type\":\"bearer\",\"expires_in\":900}",
		);
	});
	let resolver = oauth2_resolver(&server);

	resolver.resolve(&HeaderMap::new()).expect("Initial resolution should succeed.");

	// Force the cache past its expiry instant.
	resolver.cache().store(CachedToken {
		access_token: SecretString::new("stale-token"),
		expires_at: OffsetDateTime::now_utc() - Duration::seconds(5),
	});

	let resolved = resolver
		.resolve(&HeaderMap::new())
		.expect("Expired cache should trigger one refresh.");

	assert_eq!(authorization(&resolved), Some("Bearer fresh-token"));

	mock.assert_calls(2);
}

#[test]
fn token_endpoint_rejections_carry_the_response_body() {
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(POST).path("/token");
		then.status(401).body("invalid_client");
	});

	let resolver = oauth2_resolver(&server);
	let err = resolver
		.resolve(&HeaderMap::new())
		.expect_err("A 401 from the token endpoint must fail resolution.");

	match err {
		Error::Auth(AuthError::TokenEndpoint { status, body }) => {
			assert_eq!(status, 401);
			assert_eq!(body, "invalid_client");
		},
		other => panic!("Expected a token endpoint error, got {other:?}."),
	}
}

#[test]
fn malformed_token_bodies_fail_with_a_parse_error() {
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(POST).path("/token");
		then.status(200)
			.header("content-type", "application/json")
			.body("{\"access_token\":\"x\"}");
	});

	let resolver = oauth2_resolver(&server);
	let err = resolver
		.resolve(&HeaderMap::new())
		.expect_err("A token body without expires_in must fail resolution.");

	assert!(matches!(err, Error::Auth(AuthError::TokenResponseParse { .. })));
}

#[test]
fn non_positive_lifetimes_are_rejected() {
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(POST).path("/token");
		then.status(200)
			.header("content-type", "application/json")
			.body("{\"access_token\":\"x\",\"expires_in\":0}");
	});

	let resolver = oauth2_resolver(&server);
	let err = resolver
		.resolve(&HeaderMap::new())
		.expect_err("A zero-second lifetime must fail resolution.");

	assert!(matches!(err, Error::Auth(AuthError::NonPositiveExpiresIn)));
}
