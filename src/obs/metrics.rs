// std
use std::time::Duration as StdDuration;
// self
use crate::obs::{FlowKind, FlowOutcome};

/// Increments `bearer_relay_flow_total{flow, outcome}` (when the `metrics` feature is enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"bearer_relay_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records one login round trip in `bearer_relay_login_duration_seconds{outcome}`.
pub fn record_login_duration(elapsed: StdDuration, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("bearer_relay_login_duration_seconds", "outcome" => outcome.as_str())
			.record(elapsed.as_secs_f64());
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (elapsed, outcome);
	}
}
