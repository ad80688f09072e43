//! Login capability that exchanges fixed client credentials for a bearer token.
//!
//! The mediator only knows it can call a [`LoginFunction`] and receive either a [`Token`] or a
//! [`LoginError`]; how the call travels is up to the implementation. [`HttpLogin`] covers the
//! common JSON-over-HTTPS case and [`LoginFn`] adapts any async closure.

#[cfg(feature = "reqwest")] mod http;

#[cfg(feature = "reqwest")] pub use http::*;

// self
use crate::{
	_prelude::*,
	auth::{Credentials, Token, TokenBuildError},
	error::TransportError,
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Boxed future returned by [`LoginFunction::login`].
pub type LoginFuture<'a> = Pin<Box<dyn Future<Output = Result<Token, LoginError>> + 'a + Send>>;

/// Network call that trades [`Credentials`] for a fresh [`Token`].
pub trait LoginFunction
where
	Self: Send + Sync,
{
	/// Performs one login attempt.
	fn login<'a>(&'a self, credentials: &'a Credentials) -> LoginFuture<'a>;
}

/// Failures raised by a login attempt.
#[derive(Debug, ThisError)]
pub enum LoginError {
	/// The credentials could not be encoded into a request body.
	#[error("Login request body could not be encoded.")]
	Encode {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// The login endpoint answered with a non-success status.
	#[error("Login endpoint rejected the request with status {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Truncated response body, when one was returned.
		body_preview: Option<String>,
	},
	/// The login endpoint responded with a body that could not be parsed.
	#[error("Login endpoint returned a malformed body.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
	/// The response carried no usable expiry.
	#[error("Login response does not state when the token expires.")]
	MissingExpiry,
	/// The response stated a relative expiry that is zero or negative.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiry,
	/// The response stated an absolute expiry that is not a timestamp.
	#[error("The expiry timestamp `{value}` cannot be parsed.")]
	InvalidExpiry {
		/// Raw timestamp string.
		value: String,
	},
	/// The returned bearer value is unusable.
	#[error("Login endpoint returned an unusable token.")]
	InvalidToken(#[from] TokenBuildError),
	/// The login request never completed.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Adapter turning an async closure into a [`LoginFunction`].
///
/// The closure receives its own clone of the credentials so the returned future can be
/// `'static`.
pub struct LoginFn<F>(F);
impl<F, Fut> LoginFn<F>
where
	F: Fn(Credentials) -> Fut,
	Fut: 'static + Send + Future<Output = Result<Token, LoginError>>,
{
	/// Wraps `f`.
	pub fn new(f: F) -> Self {
		Self(f)
	}
}
impl<F, Fut> LoginFunction for LoginFn<F>
where
	F: Send + Sync + Fn(Credentials) -> Fut,
	Fut: 'static + Send + Future<Output = Result<Token, LoginError>>,
{
	fn login<'a>(&'a self, credentials: &'a Credentials) -> LoginFuture<'a> {
		Box::pin((self.0)(credentials.clone()))
	}
}
impl<F> Debug for LoginFn<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("LoginFn(..)")
	}
}

pub(crate) fn body_preview(body: &[u8]) -> Option<String> {
	if body.is_empty() {
		return None;
	}

	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return Some(text.into_owned());
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	Some(buf)
}
