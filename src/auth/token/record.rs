//! Immutable bearer token values, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{
		claims::{self, ClaimsError, TokenClaims},
		token::secret::TokenSecret,
	},
};

/// Current lifecycle status for a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token may still be presented.
	Active,
	/// Token reached its expiry instant.
	Expired,
}

/// Errors produced by [`TokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenBuildError {
	/// Issued when no bearer value was provided.
	#[error("Bearer value is required.")]
	MissingValue,
	/// Bearer value contains characters that cannot travel in an HTTP header.
	#[error("Bearer value must consist of visible ASCII characters.")]
	InvalidValue,
	/// Issued when no expiry (absolute, relative, or claim-derived) was available.
	#[error("Expiry must be supplied via expires_at, expires_in, or an `exp` claim.")]
	MissingExpiry,
	/// The relative expiry lands outside the representable calendar range.
	#[error("Expiry lies outside the supported date range.")]
	ExpiryOutOfRange,
	/// The value was expected to carry an `exp` claim but could not be decoded.
	#[error("Unable to read the expiry claim from the bearer value.")]
	Claims(#[from] ClaimsError),
}

/// Cached bearer credential.
///
/// A token never changes after construction; refreshing produces a new instance. It is usable
/// while `now < expires_at`, with no built-in grace period.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	value: TokenSecret,
	issued_at: OffsetDateTime,
	expires_at: OffsetDateTime,
}
impl Token {
	/// Returns a builder for constructing tokens.
	pub fn builder() -> TokenBuilder {
		TokenBuilder::default()
	}

	/// Opaque bearer value; callers must avoid logging it.
	pub fn value(&self) -> &TokenSecret {
		&self.value
	}

	/// Instant the token was obtained.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// Instant from which the token is no longer usable.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.expires_at { TokenStatus::Active } else { TokenStatus::Expired }
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the token may be presented at the provided instant.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Returns `true` if the token may be presented right now.
	pub fn is_usable(&self) -> bool {
		matches!(self.status(), TokenStatus::Active)
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Returns `true` when this token carries the provided bearer value.
	pub fn has_value(&self, value: &TokenSecret) -> bool {
		&self.value == value
	}

	/// Decodes the JWT payload claims carried by the bearer value (without verifying it).
	pub fn claims(&self) -> Result<TokenClaims, ClaimsError> {
		TokenClaims::decode(self.value.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("value", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Token`].
#[derive(Clone, Debug, Default)]
pub struct TokenBuilder {
	value: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	expiry_from_claims: bool,
}
impl TokenBuilder {
	/// Provides the bearer value.
	pub fn value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(TokenSecret::new(value));

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Convenience helper that stamps `issued_at` with the current clock.
	pub fn issued_now(self) -> Self {
		self.issued_at(OffsetDateTime::now_utc())
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Falls back to the JWT `exp` claim when neither absolute nor relative expiry is set.
	pub fn expiry_from_claims(mut self) -> Self {
		self.expiry_from_claims = true;

		self
	}

	/// Consumes the builder and produces a [`Token`].
	pub fn build(self) -> Result<Token, TokenBuildError> {
		let value = self.value.ok_or(TokenBuildError::MissingValue)?;

		validate_value(&value)?;

		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(TokenBuildError::ExpiryOutOfRange)?,
			(None, None) if self.expiry_from_claims =>
				claims::expiry_claim(value.expose())?.ok_or(TokenBuildError::MissingExpiry)?,
			(None, None) => return Err(TokenBuildError::MissingExpiry),
		};

		Ok(Token { value, issued_at, expires_at })
	}
}

fn validate_value(value: &TokenSecret) -> Result<(), TokenBuildError> {
	if value.is_empty() {
		return Err(TokenBuildError::MissingValue);
	}
	if !value.expose().bytes().all(|b| b.is_ascii_graphic()) {
		return Err(TokenBuildError::InvalidValue);
	}

	Ok(())
}
