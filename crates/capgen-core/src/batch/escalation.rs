//! Error escalation: serializing concurrent failures into one decision point.

use super::cancel::CancelFlag;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What to do about a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Cancel the rest of the batch
    Stop,
    /// Leave this item's caption unchanged and continue
    Skip,
}

/// Port through which a failure is surfaced for a decision.
///
/// The host supplies the implementation: a real dialog, an interactive CLI
/// prompt, or a headless policy. The core only depends on "a function from
/// error message to a decision".
#[async_trait]
pub trait DecisionHandler: Send + Sync {
    async fn resolve(&self, message: &str) -> Decision;
}

/// Headless policy that always skips the failing item.
pub struct AutoSkip;

#[async_trait]
impl DecisionHandler for AutoSkip {
    async fn resolve(&self, message: &str) -> Decision {
        tracing::warn!("Skipping failed item: {message}");
        Decision::Skip
    }
}

/// Headless policy that stops the batch on the first failure.
pub struct AutoStop;

#[async_trait]
impl DecisionHandler for AutoStop {
    async fn resolve(&self, message: &str) -> Decision {
        tracing::warn!("Stopping batch on failure: {message}");
        Decision::Stop
    }
}

/// Serializes concurrent failures into a single escalation at a time.
///
/// Workers that fail while a peer's escalation is pending queue on the gate;
/// once through, a worker whose peer already chose Stop gets `Stop` back
/// without the handler being consulted again. This prevents both stacked
/// prompts and double-cancellation under bounded parallelism.
pub struct ErrorEscalationCoordinator {
    handler: Arc<dyn DecisionHandler>,
    cancel: CancelFlag,
    gate: Mutex<()>,
}

impl ErrorEscalationCoordinator {
    pub fn new(handler: Arc<dyn DecisionHandler>, cancel: CancelFlag) -> Self {
        Self {
            handler,
            cancel,
            gate: Mutex::new(()),
        }
    }

    /// Surface a failure and return the decision to apply.
    ///
    /// A `Stop` decision triggers the shared cancel flag exactly once,
    /// while the gate is still held.
    pub async fn escalate(&self, message: &str) -> Decision {
        let _gate = self.gate.lock().await;

        if self.cancel.is_cancelled() {
            return Decision::Stop;
        }

        let decision = self.handler.resolve(message).await;
        if decision == Decision::Stop {
            self.cancel.cancel();
        }
        decision
    }
}
