// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how a mediator obtained its tokens.
#[derive(Debug, Default)]
pub struct MediatorMetrics {
	cache_hits: AtomicU64,
	logins: AtomicU64,
	login_failures: AtomicU64,
	retries: AtomicU64,
}
impl MediatorMetrics {
	/// Requests served with a cached token, including ones coalesced onto another caller's login.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Login calls issued.
	pub fn logins(&self) -> u64 {
		self.logins.load(Ordering::Relaxed)
	}

	/// Login calls that failed or timed out.
	pub fn login_failures(&self) -> u64 {
		self.login_failures.load(Ordering::Relaxed)
	}

	/// Requests re-sent after a rejected token.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_login(&self) {
		self.logins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_login_failure(&self) {
		self.login_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}
}
