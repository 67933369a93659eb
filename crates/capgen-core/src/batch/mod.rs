//! Batch captioning: orchestration, error escalation, and cancellation.

pub(crate) mod cancel;
pub(crate) mod escalation;
pub(crate) mod orchestrator;

pub use cancel::CancelFlag;
pub use escalation::{AutoSkip, AutoStop, Decision, DecisionHandler, ErrorEscalationCoordinator};
pub use orchestrator::{BatchOptions, BatchReport, ItemOutcome, Orchestrator};
