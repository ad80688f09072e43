//! Relay-level error types shared across the mediator, login functions, and transports.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The login call failed; no request was sent without a credential.
	#[error("Authentication is unavailable: {0}")]
	AuthenticationUnavailable(
		#[from]
		#[source]
		crate::login::LoginError,
	),
	/// The downstream service rejected the final request as unauthorized.
	///
	/// Raised after the single refresh-and-retry, or directly when a rejected request could not
	/// be replayed.
	#[error("Request was rejected as unauthorized with status {status}.")]
	AuthorizationRejected {
		/// Final HTTP status returned by the downstream service.
		status: u16,
	},
	/// Transport failure (DNS, TCP, TLS) while sending the request.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The interception was cancelled by the caller.
	#[error("Request interception was cancelled.")]
	Cancelled,
	/// An operation exceeded its configured deadline.
	#[error("The {operation} call timed out.")]
	TimedOut {
		/// Operation label (`login`, `send`).
		operation: &'static str,
	},
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Login endpoint URL cannot be parsed.
	#[error("Login endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Login endpoint must use HTTPS.
	#[error("The login endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Client identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Client secret was empty.
	#[error("Client secret cannot be empty.")]
	EmptyClientSecret,
	/// Configuration document is malformed.
	#[error("Configuration document is malformed.")]
	Parse {
		/// Structured parsing failure pointing at the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Environment variable is missing.
	#[error("Environment variable `{name}` is not set.")]
	MissingVariable {
		/// Variable name.
		name: String,
	},
	/// Environment variable holds an unusable value.
	#[error("Environment variable `{name}` holds an invalid value: {reason}.")]
	InvalidVariable {
		/// Variable name.
		name: String,
		/// Human-readable reason.
		reason: String,
	},
	/// Expiry skew exceeds the supported ceiling.
	#[error("Expiry skew of {secs}s exceeds the {max}s ceiling.")]
	ExpirySkewTooLarge {
		/// Requested skew, in seconds.
		secs: u64,
		/// Largest accepted skew, in seconds.
		max: u64,
	},
	/// Configuration file could not be read.
	#[error("Configuration file could not be read.")]
	Io(#[from] std::io::Error),
	/// Bearer value cannot be encoded as a header.
	#[error("Bearer token cannot be encoded as an Authorization header.")]
	InvalidHeader {
		/// Underlying header encoding failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a header encoding failure inside [`ConfigError`].
	pub fn invalid_header(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidHeader { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
