//! Reqwest-backed [`LoginFunction`] posting JSON credentials to a login endpoint.

// crates.io
use reqwest::{
	header::{ACCEPT, CONTENT_TYPE},
	redirect::Policy,
};
use serde_json::Value;
use time::{
	PrimitiveDateTime,
	format_description::well_known::{Iso8601, Rfc3339},
};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Token, TokenBuildError, TokenBuilder},
	config::LoginEndpoint,
	error::{ConfigError, TransportError},
	login::{self, LoginError, LoginFunction, LoginFuture},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
	client_id: &'a str,
	client_secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginEnvelope {
	#[serde(alias = "access_token", alias = "accessToken")]
	token: String,
	#[serde(default, alias = "expiration", alias = "expires_at")]
	expires_at: Option<String>,
	#[serde(default, alias = "expires_in")]
	expires_in: Option<i64>,
}

/// Login function that POSTs `{"clientId", "clientSecret"}` to a [`LoginEndpoint`].
///
/// The endpoint may answer with a JSON object (`token` plus `expiresAt` or `expiresIn`) or with
/// a bare JSON string holding a JWT whose `exp` claim supplies the expiry. Redirects are never
/// followed so credentials cannot be forwarded to another origin.
#[derive(Clone, Debug)]
pub struct HttpLogin {
	client: ReqwestClient,
	endpoint: LoginEndpoint,
}
impl HttpLogin {
	/// Builds a login function with a dedicated, redirect-free reqwest client.
	pub fn new(endpoint: LoginEndpoint) -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self { client, endpoint })
	}

	/// Reuses an existing reqwest client.
	pub fn with_client(client: ReqwestClient, endpoint: LoginEndpoint) -> Self {
		Self { client, endpoint }
	}

	/// Endpoint this function logs in against.
	pub fn endpoint(&self) -> &LoginEndpoint {
		&self.endpoint
	}
}
impl LoginFunction for HttpLogin {
	fn login<'a>(&'a self, credentials: &'a Credentials) -> LoginFuture<'a> {
		Box::pin(async move {
			let payload = encode_login_request(credentials)?;
			let mut request = self
				.client
				.post(self.endpoint.url().clone())
				.header(CONTENT_TYPE, "application/json")
				.header(ACCEPT, "application/json")
				.body(payload);

			if let Some(timeout) = self.endpoint.timeout() {
				request = request.timeout(timeout);
			}

			let response = request.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(TransportError::from)?;

			if !response_succeeded(status) {
				return Err(LoginError::Rejected { status, body_preview: login::body_preview(&body) });
			}

			parse_login_response(&body, status, OffsetDateTime::now_utc())
		})
	}
}

fn encode_login_request(credentials: &Credentials) -> Result<Vec<u8>, LoginError> {
	serde_json::to_vec(&LoginRequest {
		client_id: credentials.client_id(),
		client_secret: credentials.client_secret().expose(),
	})
	.map_err(|source| LoginError::Encode { source })
}

fn response_succeeded(status: u16) -> bool {
	(200..300).contains(&status)
}

fn parse_login_response(
	body: &[u8],
	status: u16,
	issued_at: OffsetDateTime,
) -> Result<Token, LoginError> {
	let value: Value =
		serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(body))
			.map_err(|source| LoginError::Parse { source, status })?;
	let builder = match value {
		Value::String(bare) => Token::builder().value(bare).issued_at(issued_at).expiry_from_claims(),
		other => {
			let envelope: LoginEnvelope = serde_path_to_error::deserialize(other)
				.map_err(|source| LoginError::Parse { source, status })?;

			envelope_builder(envelope, issued_at)?
		},
	};

	builder.build().map_err(|e| match e {
		TokenBuildError::MissingExpiry => LoginError::MissingExpiry,
		other => LoginError::InvalidToken(other),
	})
}

fn envelope_builder(
	envelope: LoginEnvelope,
	issued_at: OffsetDateTime,
) -> Result<TokenBuilder, LoginError> {
	let builder = Token::builder().value(envelope.token).issued_at(issued_at);

	if let Some(raw) = envelope.expires_at {
		return Ok(builder.expires_at(parse_instant(&raw)?));
	}
	if let Some(secs) = envelope.expires_in {
		if secs <= 0 {
			return Err(LoginError::NonPositiveExpiry);
		}

		return Ok(builder.expires_in(Duration::seconds(secs)));
	}

	Ok(builder.expiry_from_claims())
}

// Offset-less timestamps are read as UTC.
fn parse_instant(raw: &str) -> Result<OffsetDateTime, LoginError> {
	OffsetDateTime::parse(raw, &Rfc3339)
		.or_else(|_| PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(|p| p.assume_utc()))
		.map_err(|_| LoginError::InvalidExpiry { value: raw.to_owned() })
}
