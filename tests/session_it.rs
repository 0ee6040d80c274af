// std
use std::{fs, io::Write, sync::Arc};
// crates.io
use flate2::{Compression, write::GzEncoder};
use http::{HeaderMap, Method};
use httpmock::prelude::*;
use url::Url;
// self
use http_courier::{
	session::{RetryPolicy, SessionReply, TransportSession},
	transport::ReqwestTransport,
};

fn session() -> TransportSession<ReqwestTransport> {
	let transport =
		Arc::new(ReqwestTransport::new().expect("Test transport should build."));

	TransportSession::new(
		transport,
		RetryPolicy { backoff_factor: 0., ..Default::default() },
	)
}

fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse.")
}

#[test]
fn cookies_set_by_one_call_replay_on_the_next() {
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(GET).path("/login");
		then.status(200).header("set-cookie", "sid=abc; Path=/");
	});

	let replay = server.mock(|when, then| {
		when.method(GET).path("/data").header("cookie", "sid=abc");
		then.status(200).body("with cookie");
	});
	let session = session();

	session
		.execute(Method::GET, &url(&server, "/login"), HeaderMap::new(), None)
		.expect("Cookie-setting call should succeed.");

	let response = session
		.execute(Method::GET, &url(&server, "/data"), HeaderMap::new(), None)
		.expect("Cookie-replaying call should succeed.");

	assert_eq!(response.text(), "with cookie");

	replay.assert_calls(1);
}

#[test]
fn cleared_cookies_are_not_replayed() {
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(GET).path("/login");
		then.status(200).header("set-cookie", "sid=abc");
	});

	let session = session();

	session
		.execute(Method::GET, &url(&server, "/login"), HeaderMap::new(), None)
		.expect("Cookie-setting call should succeed.");

	assert_eq!(session.cookies().records().len(), 1);

	session.cookies().clear();

	assert!(session.cookies().records().is_empty());
}

#[test]
fn gzip_bodies_arrive_decompressed() {
	let mut encoder = GzEncoder::new(Vec::new(), Compression::default());

	encoder.write_all(b"compressed payload").expect("Gzip fixture should encode.");

	let compressed = encoder.finish().expect("Gzip fixture should finish.");
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(GET).path("/gz");
		then.status(200).header("content-encoding", "gzip").body(compressed);
	});

	let response = session()
		.execute(Method::GET, &url(&server, "/gz"), HeaderMap::new(), None)
		.expect("Gzip response should decode.");

	assert_eq!(response.text(), "compressed payload");
}

#[test]
fn downloads_write_the_exact_body_and_report_the_path() {
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(GET).path("/file");
		then.status(200).body("hello");
	});

	let dir = tempfile::tempdir().expect("Temp dir should be creatable.");
	let path = dir.path().join("body.bin");
	let reply = session()
		.download(Method::GET, &url(&server, "/file"), HeaderMap::new(), None, &path)
		.expect("Download should succeed.");

	match reply {
		SessionReply::Downloaded(receipt) => {
			assert_eq!(receipt.status, 200);
			assert_eq!(receipt.path, path);
		},
		SessionReply::Response(_) => panic!("A 200 GET with a path must divert to disk."),
	}

	assert_eq!(
		fs::read(&path).expect("Downloaded file should exist."),
		b"hello",
	);
}
