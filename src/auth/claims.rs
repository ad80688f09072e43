//! Typed view of the claims carried in a JWT bearer value.
//!
//! The payload is read without signature verification; the relay only needs it to learn when a
//! token expires and to let callers inspect who it was issued to. Roles form a closed set and are
//! matched case-insensitively, so `"admin"` and `"Admin"` can never silently diverge.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Errors emitted while decoding token claims.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClaimsError {
	/// The value is not a three-segment compact JWT.
	#[error("Bearer value is not a compact JWT.")]
	NotCompact,
	/// The payload segment is not valid base64url.
	#[error("JWT payload is not valid base64url: {reason}.")]
	Encoding {
		/// Decoder message.
		reason: String,
	},
	/// The payload is not the expected JSON object.
	#[error("JWT payload is malformed: {reason}.")]
	Payload {
		/// Parser message.
		reason: String,
	},
	/// A role claim named a role outside the supported set.
	#[error("Unknown role `{role}`.")]
	UnknownRole {
		/// Offending role string.
		role: String,
	},
	/// A NumericDate claim cannot be represented.
	#[error("The `{claim}` claim is out of range.")]
	TimestampOutOfRange {
		/// Claim name.
		claim: &'static str,
	},
}

/// Roles recognized in token claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
	/// Full administrative access.
	Admin,
	/// Department-level management access.
	Manager,
	/// Regular authenticated access.
	User,
}
impl Role {
	/// Canonical claim spelling.
	pub const fn as_str(self) -> &'static str {
		match self {
			Role::Admin => "Admin",
			Role::Manager => "Manager",
			Role::User => "User",
		}
	}
}
impl Display for Role {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Role {
	type Err = ClaimsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		[Role::Admin, Role::Manager, Role::User]
			.into_iter()
			.find(|role| role.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| ClaimsError::UnknownRole { role: s.to_owned() })
	}
}

/// Claims decoded from a bearer value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenClaims {
	/// `sub` claim.
	pub subject: Option<String>,
	/// `role` claims (short or WS-Federation spelling, single value or array).
	pub roles: Vec<Role>,
	/// `exp` claim.
	pub expires_at: Option<OffsetDateTime>,
	/// `iat` claim.
	pub issued_at: Option<OffsetDateTime>,
}
impl TokenClaims {
	/// Decodes the payload segment of a compact JWT.
	pub fn decode(value: &str) -> Result<Self, ClaimsError> {
		let raw: RawClaims = decode_payload(value)?;

		Ok(Self {
			subject: raw.sub,
			roles: raw
				.role
				.map(OneOrMany::into_vec)
				.unwrap_or_default()
				.iter()
				.map(|role| role.parse())
				.collect::<Result<_, _>>()?,
			expires_at: raw.exp.map(|secs| numeric_date("exp", secs)).transpose()?,
			issued_at: raw.iat.map(|secs| numeric_date("iat", secs)).transpose()?,
		})
	}

	/// Returns `true` when the claims grant `role`.
	pub fn has_role(&self, role: Role) -> bool {
		self.roles.contains(&role)
	}
}

#[derive(Deserialize)]
struct RawClaims {
	#[serde(default)]
	sub: Option<String>,
	#[serde(
		default,
		alias = "roles",
		alias = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role"
	)]
	role: Option<OneOrMany>,
	#[serde(default)]
	exp: Option<f64>,
	#[serde(default)]
	iat: Option<f64>,
}

#[derive(Deserialize)]
struct ExpiryOnly {
	#[serde(default)]
	exp: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
	One(String),
	Many(Vec<String>),
}
impl OneOrMany {
	fn into_vec(self) -> Vec<String> {
		match self {
			OneOrMany::One(role) => vec![role],
			OneOrMany::Many(roles) => roles,
		}
	}
}

/// Reads only the `exp` claim, ignoring every other field.
pub(crate) fn expiry_claim(value: &str) -> Result<Option<OffsetDateTime>, ClaimsError> {
	let raw: ExpiryOnly = decode_payload(value)?;

	raw.exp.map(|secs| numeric_date("exp", secs)).transpose()
}

fn decode_payload<T>(value: &str) -> Result<T, ClaimsError>
where
	T: for<'de> Deserialize<'de>,
{
	let mut segments = value.split('.');
	let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
		(Some(_), Some(payload), Some(_), None) => payload,
		_ => return Err(ClaimsError::NotCompact),
	};
	let bytes = URL_SAFE_NO_PAD
		.decode(payload.trim_end_matches('='))
		.map_err(|e| ClaimsError::Encoding { reason: e.to_string() })?;

	serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Payload { reason: e.to_string() })
}

fn numeric_date(claim: &'static str, secs: f64) -> Result<OffsetDateTime, ClaimsError> {
	if !secs.is_finite() || secs.abs() > i64::MAX as f64 {
		return Err(ClaimsError::TimestampOutOfRange { claim });
	}

	OffsetDateTime::from_unix_timestamp(secs.trunc() as i64)
		.map_err(|_| ClaimsError::TimestampOutOfRange { claim })
}
