#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
// self
use bearer_relay::{
	_preludet::*,
	auth::Token,
	config::RelayConfig,
	http::ReqwestEndpoint,
	mediator::AuthenticatingMediator,
	pipeline::Pipeline,
	store::{MemoryTokenStore, TokenStore},
};

const CLIENT_ID: &str = "web-app-001";
const CLIENT_SECRET: &str = "s3cret";

fn seed(store: &MemoryTokenStore, value: &str) {
	let issued = OffsetDateTime::now_utc();

	store.set(
		Token::builder()
			.value(value)
			.issued_at(issued)
			.expires_at(issued + Duration::minutes(10))
			.build()
			.expect("Seed token should build."),
	);
}

fn get(url: &str) -> reqwest::Request {
	test_reqwest_client().get(url).build().expect("Mock API request should build.")
}

async fn mock_login<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	let body = format!("{{\"token\":\"{token}\",\"expiresIn\":1200}}");

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/login");
			then.status(200).header("content-type", "application/json").body(body.as_str());
		})
		.await
}

#[tokio::test]
async fn first_request_logs_in_and_later_requests_reuse_the_cache() {
	let server = MockServer::start_async().await;
	let login = mock_login(&server, "abc.def.ghi").await;
	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer abc.def.ghi");
			then.status(200).body("[]");
		})
		.await;
	let (mediator, store) =
		build_reqwest_test_mediator(&server.url("/api/login"), CLIENT_ID, CLIENT_SECRET);
	let client = test_reqwest_client();

	for _ in 0..3 {
		let response = mediator
			.execute(&client, get(&server.url("/orders")))
			.await
			.expect("Authenticated request should succeed.");

		assert_eq!(response.status().as_u16(), 200);
	}

	login.assert_calls_async(1).await;
	api.assert_calls_async(3).await;

	assert!(store.is_valid());
	assert_eq!(mediator.metrics().logins(), 1);
	assert_eq!(mediator.metrics().cache_hits(), 2);
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_the_request_replayed_once() {
	let server = MockServer::start_async().await;
	let login = mock_login(&server, "fresh-token").await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer stale-token");
			then.status(401).header("www-authenticate", "Bearer error=\"invalid_token\"");
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer fresh-token");
			then.status(200).body("[]");
		})
		.await;
	let (mediator, store) =
		build_reqwest_test_mediator(&server.url("/api/login"), CLIENT_ID, CLIENT_SECRET);

	seed(&store, "stale-token");

	let response = mediator
		.execute(&test_reqwest_client(), get(&server.url("/orders")))
		.await
		.expect("Replayed request should succeed.");

	assert_eq!(response.status().as_u16(), 200);

	login.assert_calls_async(1).await;
	stale.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;

	assert_eq!(store.get().map(|t| t.value().expose().to_owned()).as_deref(), Some("fresh-token"));
}

#[tokio::test]
async fn forbidden_responses_reach_the_caller_untouched() {
	let server = MockServer::start_async().await;
	let login = mock_login(&server, "unused-token").await;
	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin");
			then.status(403).body("missing role");
		})
		.await;
	let (mediator, store) =
		build_reqwest_test_mediator(&server.url("/api/login"), CLIENT_ID, CLIENT_SECRET);

	seed(&store, "user-token");

	let response = mediator
		.execute(&test_reqwest_client(), get(&server.url("/admin")))
		.await
		.expect("Forbidden responses are not errors.");

	assert_eq!(response.status().as_u16(), 403);
	assert_eq!(response.text().await.expect("Body should be readable."), "missing role");

	login.assert_calls_async(0).await;
	api.assert_calls_async(1).await;
}

#[tokio::test]
async fn pipeline_stage_signs_requests_for_the_reqwest_endpoint() {
	let server = MockServer::start_async().await;
	let login = mock_login(&server, "pipeline-token").await;
	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer pipeline-token");
			then.status(200).body("[]");
		})
		.await;
	let (mediator, _store) =
		build_reqwest_test_mediator(&server.url("/api/login"), CLIENT_ID, CLIENT_SECRET);
	let pipeline = Pipeline::new(ReqwestEndpoint::with_client(test_reqwest_client())).with(mediator);
	let response = pipeline
		.send(get(&server.url("/orders")))
		.await
		.expect("Pipeline request should succeed.");

	assert_eq!(response.status().as_u16(), 200);

	login.assert_calls_async(1).await;
	api.assert_calls_async(1).await;
}

#[tokio::test]
async fn mediator_builds_from_a_config_document() {
	let server = MockServer::start_async().await;
	let login = mock_login(&server, "config-token").await;
	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer config-token");
			then.status(200).body("[]");
		})
		.await;
	let config = RelayConfig::from_json_str(&format!(
		"{{\"loginUrl\":\"{}\",\"clientId\":\"{CLIENT_ID}\",\"clientSecret\":\"{CLIENT_SECRET}\",\"allowInsecure\":true,\"loginTimeoutSecs\":5}}",
		server.url("/api/login"),
	))
	.expect("Config document should parse.");
	let store = Arc::new(MemoryTokenStore::default());
	let mediator =
		AuthenticatingMediator::from_config_with_client(&config, store.clone(), test_reqwest_client())
			.expect("Mediator should build from config.");
	let response = mediator
		.execute(&test_reqwest_client(), get(&server.url("/orders")))
		.await
		.expect("Configured mediator should authenticate requests.");

	assert_eq!(response.status().as_u16(), 200);

	login.assert_calls_async(1).await;
	api.assert_calls_async(1).await;

	assert!(store.is_valid());
	assert_eq!(mediator.config().login_timeout, Some(std::time::Duration::from_secs(5)));
}
