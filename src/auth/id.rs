//! Strongly typed identifiers for clients and sessions.
//!
//! Both identifiers share one validated string wrapper, [`Identifier`], parameterized by a
//! zero-sized [`IdKind`] that fixes the label used in errors, the length ceiling, and the
//! accepted alphabet.

// std
use std::{borrow::Borrow, marker::PhantomData, ops::Deref};
// crates.io
use serde::{Deserializer, Serializer, de::Error as _};
// self
use crate::_prelude::*;

/// Client identifier presented to the login endpoint.
pub type ClientId = Identifier<Client>;
/// Logical session key owning a dedicated token store.
pub type SessionId = Identifier<Session>;

/// Validation rules for one family of identifiers.
pub trait IdKind {
	/// Label used in error messages and `Debug` output.
	const LABEL: &'static str;
	/// Maximum length in bytes.
	const MAX_LEN: usize;

	/// Returns `true` when `c` may appear in the identifier.
	fn allows(c: char) -> bool;
}

/// Marker for [`ClientId`]: any visible ASCII character, up to 128 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Client {}
impl IdKind for Client {
	const LABEL: &'static str = "Client";
	const MAX_LEN: usize = 128;

	fn allows(c: char) -> bool {
		c.is_ascii_graphic()
	}
}

/// Marker for [`SessionId`]: cookie-safe characters (`A-Z a-z 0-9 - . _ ~ + / =`), up to 256
/// bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Session {}
impl IdKind for Session {
	const LABEL: &'static str = "Session";
	const MAX_LEN: usize = 256;

	fn allows(c: char) -> bool {
		c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '+' | '/' | '=')
	}
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Identifier label.
		kind: &'static str,
	},
	/// The identifier contains a character outside its alphabet.
	#[error("{kind} identifier contains the disallowed character {character:?}.")]
	InvalidCharacter {
		/// Identifier label.
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The identifier exceeded its length ceiling.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Identifier label.
		kind: &'static str,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

/// Validated identifier string.
pub struct Identifier<K> {
	value: String,
	kind: PhantomData<fn() -> K>,
}
impl<K> Identifier<K>
where
	K: IdKind,
{
	/// Validates `value` against the rules of `K`.
	pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
		let value = value.into();

		if value.is_empty() {
			return Err(IdentifierError::Empty { kind: K::LABEL });
		}
		if let Some(character) = value.chars().find(|c| !K::allows(*c)) {
			return Err(IdentifierError::InvalidCharacter { kind: K::LABEL, character });
		}
		if value.len() > K::MAX_LEN {
			return Err(IdentifierError::TooLong { kind: K::LABEL, max: K::MAX_LEN });
		}

		Ok(Self { value, kind: PhantomData })
	}
}
impl<K> Identifier<K> {
	/// Borrows the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.value
	}

	/// Returns the owned string.
	pub fn into_inner(self) -> String {
		self.value
	}
}
impl<K> Clone for Identifier<K> {
	fn clone(&self) -> Self {
		Self { value: self.value.clone(), kind: PhantomData }
	}
}
impl<K> PartialEq for Identifier<K> {
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
	}
}
impl<K> Eq for Identifier<K> {}
impl<K> PartialOrd for Identifier<K> {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}
impl<K> Ord for Identifier<K> {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.value.cmp(&other.value)
	}
}
// Must agree with `Borrow<str>` so maps keyed by identifiers accept `&str` lookups.
impl<K> std::hash::Hash for Identifier<K> {
	fn hash<H>(&self, state: &mut H)
	where
		H: std::hash::Hasher,
	{
		self.value.hash(state);
	}
}
impl<K> Deref for Identifier<K> {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.value
	}
}
impl<K> AsRef<str> for Identifier<K> {
	fn as_ref(&self) -> &str {
		&self.value
	}
}
impl<K> Borrow<str> for Identifier<K> {
	fn borrow(&self) -> &str {
		&self.value
	}
}
impl<K> Debug for Identifier<K>
where
	K: IdKind,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}({})", K::LABEL, self.value)
	}
}
impl<K> Display for Identifier<K> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}
impl<K> FromStr for Identifier<K>
where
	K: IdKind,
{
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl<K> Serialize for Identifier<K> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.value)
	}
}
impl<'de, K> Deserialize<'de> for Identifier<K>
where
	K: IdKind,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Self::new(String::deserialize(deserializer)?).map_err(D::Error::custom)
	}
}
