//! Token store contract and the built-in in-memory and per-session implementations.

pub mod memory;
pub mod session;

pub use memory::MemoryTokenStore;
pub use session::SessionStores;

// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret},
};

/// Holder of at most one cached [`Token`].
///
/// Every operation is an in-memory state transition and cannot fail. Implementations must make
/// each call atomic so no reader ever observes a half-written token; concurrent `set` calls are
/// last-writer-wins. A store belongs to exactly one logical client identity: in a multi-user
/// server, use one store per session (see [`SessionStores`]), never a shared instance.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the cached token, valid or not.
	fn get(&self) -> Option<Token>;

	/// Returns the cached token only if it is still usable at `instant`, in a single atomic read.
	fn get_if_valid_at(&self, instant: OffsetDateTime) -> Option<Token>;

	/// Replaces the cached token unconditionally.
	fn set(&self, token: Token);

	/// Removes the cached token.
	fn clear(&self);

	/// Removes the cached token only if it still carries `value`.
	///
	/// Returns `true` when a token was removed.
	fn clear_if(&self, value: &TokenSecret) -> bool;

	/// Single-flight guard serializing refreshes against this store.
	fn refresh_guard(&self) -> &AsyncMutex<()>;

	/// Returns `true` if a token is present and usable at `instant`.
	fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		self.get_if_valid_at(instant).is_some()
	}

	/// Returns `true` if a token is present and usable right now.
	fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Returns the cached token if it is usable right now.
	fn get_if_valid(&self) -> Option<Token> {
		self.get_if_valid_at(OffsetDateTime::now_utc())
	}
}
