//! Response classification hooks deciding when a token counts as rejected.
//!
//! Implementations only see plain data (status code and the raw challenge header) so they stay
//! independent of any HTTP client.

// self
use crate::{
	_prelude::*,
	http::{STATUS_FORBIDDEN, STATUS_UNAUTHORIZED},
};

/// Hook that tells the mediator how to treat a downstream response.
pub trait ResponsePolicy
where
	Self: Send + Sync,
{
	/// Classifies the response described by `ctx`.
	fn classify(&self, ctx: &ResponseContext<'_>) -> ResponseClass;
}

/// What the mediator should do with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseClass {
	/// Hand the response back untouched.
	Passed,
	/// The bearer token was refused; invalidate it, log in again, and retry once.
	TokenRejected,
	/// The caller is authenticated but lacks permission; never refresh.
	Forbidden,
}

/// Data available to a [`ResponsePolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseContext<'a> {
	/// HTTP status code.
	pub status: u16,
	/// Raw `WWW-Authenticate` header value, if the transport exposes it.
	pub www_authenticate: Option<&'a str>,
}
impl<'a> ResponseContext<'a> {
	/// Creates a context for `status`.
	pub fn new(status: u16) -> Self {
		Self { status, www_authenticate: None }
	}

	/// Adds the `WWW-Authenticate` challenge.
	pub fn with_www_authenticate(mut self, challenge: Option<&'a str>) -> Self {
		self.www_authenticate = challenge;

		self
	}

	/// Extracts the `error` parameter of a `Bearer` challenge (for example `invalid_token`).
	pub fn bearer_error(&self) -> Option<&'a str> {
		let challenge = self.www_authenticate?.trim();
		let (scheme, params) = challenge.split_once(char::is_whitespace)?;

		if !scheme.eq_ignore_ascii_case("bearer") {
			return None;
		}

		params.split(',').find_map(|param| {
			let (key, value) = param.split_once('=')?;

			key.trim().eq_ignore_ascii_case("error").then(|| value.trim().trim_matches('"'))
		})
	}
}

/// Default policy: `401` means the token was rejected, `403` is passed through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultResponsePolicy;
impl Display for DefaultResponsePolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-response-policy")
	}
}
impl ResponsePolicy for DefaultResponsePolicy {
	fn classify(&self, ctx: &ResponseContext<'_>) -> ResponseClass {
		match ctx.status {
			STATUS_UNAUTHORIZED => ResponseClass::TokenRejected,
			STATUS_FORBIDDEN => ResponseClass::Forbidden,
			_ => ResponseClass::Passed,
		}
	}
}
