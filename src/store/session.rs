//! Per-session token stores for server processes acting on behalf of many users.

// self
use crate::{_prelude::*, auth::SessionId, store::MemoryTokenStore};

struct SessionEntry {
	store: Arc<MemoryTokenStore>,
	last_seen: OffsetDateTime,
}

/// Map of session keys to dedicated token stores, evicted once a session goes idle.
///
/// Each session receives its own [`MemoryTokenStore`], so one user's bearer token can never be
/// attached to another user's request.
pub struct SessionStores {
	entries: Mutex<HashMap<SessionId, SessionEntry>>,
	idle_ttl: Duration,
}
impl SessionStores {
	/// Creates an empty map that evicts sessions idle for at least `idle_ttl`.
	pub fn new(idle_ttl: Duration) -> Self {
		Self { entries: Default::default(), idle_ttl }
	}

	/// Idle window after which sessions become eligible for eviction.
	pub fn idle_ttl(&self) -> Duration {
		self.idle_ttl
	}

	/// Returns the session's store, creating it on first use and marking the session as active.
	pub fn store_for(&self, session: &SessionId) -> Arc<MemoryTokenStore> {
		self.store_for_at(session, OffsetDateTime::now_utc())
	}

	/// Same as [`store_for`](Self::store_for) with an explicit "now".
	pub fn store_for_at(&self, session: &SessionId, instant: OffsetDateTime) -> Arc<MemoryTokenStore> {
		let mut entries = self.entries.lock();
		let entry = entries.entry(session.clone()).or_insert_with(|| SessionEntry {
			store: Arc::new(MemoryTokenStore::default()),
			last_seen: instant,
		});

		if entry.last_seen < instant {
			entry.last_seen = instant;
		}

		entry.store.clone()
	}

	/// Drops the session's store (logout or session end). Returns `true` if it existed.
	pub fn remove(&self, session: &SessionId) -> bool {
		self.entries.lock().remove(session).is_some()
	}

	/// Evicts every session idle for at least the configured TTL at `instant`.
	///
	/// A session whose store is still held elsewhere (for example by a mediator obtained through
	/// [`AuthenticatingMediator::for_session`](crate::mediator::AuthenticatingMediator::for_session))
	/// counts as active and is kept, so a later lookup keeps returning the same store.
	///
	/// Returns the number of evicted sessions.
	pub fn evict_idle_at(&self, instant: OffsetDateTime) -> usize {
		let mut entries = self.entries.lock();
		let before = entries.len();

		entries.retain(|_, entry| {
			Arc::strong_count(&entry.store) > 1 || instant - entry.last_seen < self.idle_ttl
		});

		before - entries.len()
	}

	/// Evicts idle sessions relative to the current clock.
	pub fn evict_idle(&self) -> usize {
		self.evict_idle_at(OffsetDateTime::now_utc())
	}

	/// Number of live sessions.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when no session holds a store.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}
impl Debug for SessionStores {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionStores")
			.field("sessions", &self.len())
			.field("idle_ttl", &self.idle_ttl)
			.finish()
	}
}
