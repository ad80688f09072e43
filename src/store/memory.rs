//! Thread-safe in-memory [`TokenStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret},
	store::TokenStore,
};

/// Process-local token slot guarded by a read-write lock.
///
/// The data lock covers a single read or write and is never held across an `.await`; refresh
/// coalescing goes through the separate async guard.
#[derive(Default)]
pub struct MemoryTokenStore {
	slot: RwLock<Option<Token>>,
	refresh: AsyncMutex<()>,
}
impl MemoryTokenStore {
	/// Creates a store pre-populated with `token`.
	pub fn with_token(token: Token) -> Self {
		Self { slot: RwLock::new(Some(token)), refresh: AsyncMutex::new(()) }
	}
}
impl TokenStore for MemoryTokenStore {
	fn get(&self) -> Option<Token> {
		self.slot.read().clone()
	}

	fn get_if_valid_at(&self, instant: OffsetDateTime) -> Option<Token> {
		self.slot.read().as_ref().filter(|token| token.is_usable_at(instant)).cloned()
	}

	fn set(&self, token: Token) {
		*self.slot.write() = Some(token);
	}

	fn clear(&self) {
		self.slot.write().take();
	}

	fn clear_if(&self, value: &TokenSecret) -> bool {
		let mut guard = self.slot.write();

		if guard.as_ref().is_some_and(|token| token.has_value(value)) {
			guard.take();

			true
		} else {
			false
		}
	}

	fn refresh_guard(&self) -> &AsyncMutex<()> {
		&self.refresh
	}
}
impl Debug for MemoryTokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryTokenStore").field("token", &*self.slot.read()).finish()
	}
}
