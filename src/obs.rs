//! Flow counters for the registration legs and the roster sweep.
//!
//! Enable the `metrics` feature to increment the `tourney_gate_flow_total`
//! counter for every attempt/success/failure, labeled by `flow` + `outcome`.
//! Without the feature the recorder compiles to a no-op; structured logging
//! via `tracing` is always on.

// self
use crate::_prelude::*;

/// Flow kinds observed by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Leg A: identity-provider callback processing.
	IdentityLeg,
	/// Leg B: chat-provider callback processing.
	ChatLeg,
	/// Periodic roster refresh sweep.
	Sweep,
}
impl FlowKind {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::IdentityLeg => "identity_leg",
			FlowKind::ChatLeg => "chat_leg",
			FlowKind::Sweep => "sweep",
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
	/// Entry to a flow handler.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure collapsed into a terminal error page or sweep report.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"tourney_gate_flow_total",
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

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_flow_outcome_noop_without_metrics() {
		record_flow_outcome(FlowKind::IdentityLeg, FlowOutcome::Failure);
	}

	#[test]
	fn labels_are_stable() {
		assert_eq!(FlowKind::ChatLeg.to_string(), "chat_leg");
		assert_eq!(FlowOutcome::Success.as_str(), "success");
	}
}
