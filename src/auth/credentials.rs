//! Fixed client credentials exchanged for bearer tokens.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
	error::ConfigError,
};

/// Client identifier and secret presented to the login endpoint.
///
/// These identify the calling application, not an end user. The value is immutable and shared
/// read-only by every mediator built from it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	client_id: ClientId,
	client_secret: TokenSecret,
}
impl Credentials {
	/// Validates and wraps a client identifier/secret pair.
	pub fn new(client_id: impl AsRef<str>, client_secret: impl Into<String>) -> Result<Self> {
		let client_id = ClientId::new(client_id.as_ref()).map_err(ConfigError::from)?;
		let client_secret = TokenSecret::new(client_secret);

		if client_secret.is_empty() {
			return Err(ConfigError::EmptyClientSecret.into());
		}

		Ok(Self { client_id, client_secret })
	}

	/// Client identifier.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Client secret; callers must avoid logging it.
	pub fn client_secret(&self) -> &TokenSecret {
		&self.client_secret
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}
