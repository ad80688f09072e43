//! Optional observability helpers for relay flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `bearer_relay.flow` with the `flow`,
//!   `stage` (call site), and `outcome` fields.
//! - Enable `metrics` to increment the `bearer_relay_flow_total` counter labeled by `flow` and
//!   `outcome`, and to record login latency in `bearer_relay_login_duration_seconds`.
//!
//! Neither signal ever carries a bearer value or client secret.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// One intercepted request, from token lookup to the final response.
	Intercept,
	/// A login call made to (re)acquire a token.
	Login,
	/// The single retry issued after a rejected token.
	Retry,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Intercept => "intercept",
			FlowKind::Login => "login",
			FlowKind::Retry => "retry",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a relay flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto its terminal outcome.
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` as one observed flow: span, attempt counter, and terminal outcome.
pub(crate) async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;
	let outcome = FlowOutcome::of(&result);

	span.record_outcome(outcome);
	record_flow_outcome(kind, outcome);

	result
}
