// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome},
};

/// Instrumented future when tracing is enabled, the bare future otherwise.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Instrumented future when tracing is enabled, the bare future otherwise.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// `bearer_relay.flow` span carrying the flow kind, call site, and final outcome.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at `stage`; the `outcome` field stays empty until recorded.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"bearer_relay.flow",
				flow = kind.as_str(),
				stage,
				outcome = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Runs `fut` inside the span.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Fills the span's `outcome` field.
	pub fn record_outcome(&self, outcome: FlowOutcome) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = outcome;
		}
	}
}

/// Emits a debug event describing a flow step inside the current span.
///
/// `detail` must never contain a bearer value or client secret.
pub fn flow_event(kind: FlowKind, outcome: FlowOutcome, detail: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(flow = kind.as_str(), outcome = outcome.as_str(), "{detail}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, outcome, detail);
	}
}
