//! Demonstrates the relay in front of a reqwest client: the first request logs in, later ones
//! reuse the cached token, and a revoked token is refreshed and the request replayed once.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use bearer_relay::{
	auth::SessionId,
	config::RelayConfig,
	http::ReqwestEndpoint,
	mediator::AuthenticatingMediator,
	pipeline::Pipeline,
	reqwest::Client,
	store::{MemoryTokenStore, SessionStores, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/login");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token\":\"demo-token\",\"expiresIn\":1200}");
		})
		.await;
	let orders_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer demo-token");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let revoked_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer revoked-token");
			then.status(401);
		})
		.await;
	let config = RelayConfig::from_json_str(&format!(
		"{{\"loginUrl\":\"{}\",\"clientId\":\"web-app-001\",\"clientSecret\":\"s3cret\",\"allowInsecure\":true}}",
		server.url("/api/login"),
	))?;
	// The mock server presents a self-signed certificate.
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;
	let store = Arc::new(MemoryTokenStore::default());
	let mediator =
		AuthenticatingMediator::from_config_with_client(&config, store.clone(), client.clone())?;

	for attempt in 1..=2 {
		let response = mediator.execute(&client, client.get(server.url("/orders")).build()?).await?;

		println!("request {attempt}: status {}", response.status());
	}

	// Simulate a token revoked by the server before its expiry.
	store.set(
		bearer_relay::auth::Token::builder()
			.value("revoked-token")
			.issued_now()
			.expires_in(time::Duration::minutes(10))
			.build()?,
	);

	let pipeline = Pipeline::new(ReqwestEndpoint::with_client(client.clone())).with(mediator.clone());
	let response = pipeline.send(client.get(server.url("/orders")).build()?).await?;

	println!("after revocation: status {}", response.status());
	println!(
		"logins: {}, cache hits: {}, retries: {}",
		mediator.metrics().logins(),
		mediator.metrics().cache_hits(),
		mediator.metrics().retries()
	);

	let sessions = SessionStores::new(time::Duration::minutes(30));
	let alice = mediator.for_session(&sessions, &SessionId::new("alice")?);
	let response = alice.execute(&client, client.get(server.url("/orders")).build()?).await?;

	println!("session alice: status {}, live sessions: {}", response.status(), sessions.len());

	login_mock.assert_calls_async(3).await;
	orders_mock.assert_calls_async(4).await;
	revoked_mock.assert_calls_async(1).await;

	Ok(())
}
