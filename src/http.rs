//! Transport seams between the mediator and whatever HTTP stack sends the requests.
//!
//! The mediator never builds or sends requests itself. It needs two capabilities from the
//! transport: writing the `Authorization: Bearer <value>` header onto an outgoing request
//! ([`SignableRequest`]) and reading the status of the response ([`StatusResponse`]). Both are
//! implemented for reqwest when the `reqwest` feature is enabled, together with
//! [`ReqwestEndpoint`], the terminal [`Endpoint`](crate::pipeline::Endpoint) of a reqwest
//! pipeline.

// self
use crate::{_prelude::*, auth::TokenSecret};
#[cfg(feature = "reqwest")]
use crate::{
	error::{ConfigError, TransportError},
	pipeline::{Endpoint, StageFuture},
};

/// Status code that triggers the one-shot refresh-and-retry.
pub const STATUS_UNAUTHORIZED: u16 = 401;
/// Status code returned unchanged to the caller.
pub const STATUS_FORBIDDEN: u16 = 403;

/// Outgoing request the mediator can sign and, when possible, replay.
pub trait SignableRequest
where
	Self: Sized + Send,
{
	/// Sets `Authorization: Bearer <token>`, replacing any existing value.
	fn attach_bearer(&mut self, token: &TokenSecret) -> Result<()>;

	/// Returns a replayable copy, or `None` when the body is a one-shot stream.
	///
	/// The copy is taken before the first send; without it a rejected request cannot be retried.
	fn try_clone(&self) -> Option<Self>;
}

/// Response whose status the mediator can classify.
pub trait StatusResponse
where
	Self: Send,
{
	/// HTTP status code.
	fn status(&self) -> u16;

	/// Raw `WWW-Authenticate` challenge, when the transport exposes headers.
	fn www_authenticate(&self) -> Option<&str> {
		None
	}
}

/// Formats the `Authorization` header value for a bearer token.
pub fn bearer_header_value(token: &TokenSecret) -> String {
	format!("Bearer {}", token.expose())
}

#[cfg(feature = "reqwest")]
impl SignableRequest for reqwest::Request {
	fn attach_bearer(&mut self, token: &TokenSecret) -> Result<()> {
		let mut value = reqwest::header::HeaderValue::try_from(bearer_header_value(token))
			.map_err(ConfigError::invalid_header)?;

		value.set_sensitive(true);
		self.headers_mut().insert(reqwest::header::AUTHORIZATION, value);

		Ok(())
	}

	fn try_clone(&self) -> Option<Self> {
		reqwest::Request::try_clone(self)
	}
}

#[cfg(feature = "reqwest")]
impl StatusResponse for reqwest::Response {
	fn status(&self) -> u16 {
		reqwest::Response::status(self).as_u16()
	}

	fn www_authenticate(&self) -> Option<&str> {
		self.headers().get(reqwest::header::WWW_AUTHENTICATE).and_then(|v| v.to_str().ok())
	}
}

/// Terminal pipeline endpoint that executes requests with a shared [`ReqwestClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestEndpoint(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestEndpoint {
	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Underlying client.
	pub fn client(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Endpoint<reqwest::Request, reqwest::Response> for ReqwestEndpoint {
	fn call(&self, request: reqwest::Request) -> StageFuture<'_, reqwest::Response> {
		Box::pin(async move { Ok(self.0.execute(request).await.map_err(TransportError::from)?) })
	}
}
