//! The batch captioning orchestrator.
//!
//! Runs a snapshot of caption items against a caption service, either
//! strictly in order or through a semaphore-bounded worker pool. Failures
//! are funneled through the escalation coordinator; cancellation is
//! cooperative and observed between items, never by aborting a request
//! already in flight.

use super::cancel::CancelFlag;
use super::escalation::{Decision, DecisionHandler, ErrorEscalationCoordinator};
use crate::error::CaptionError;
use crate::item::{CaptionItem, GeneratedCaptionPolicy};
use crate::vlm::CaptionClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Concurrency limit; 1 means strictly sequential
    pub workers: usize,
    /// Per-request deadline in milliseconds
    pub timeout_ms: u64,
    /// How generated captions interact with the persisted value
    pub caption_policy: GeneratedCaptionPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_ms: 120_000,
            caption_policy: GeneratedCaptionPolicy::default(),
        }
    }
}

/// Outcome of one item in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A caption was generated (possibly empty) and applied
    Generated,
    /// The item failed and was skipped; its caption is unchanged
    Skipped(String),
    /// The item was never started because the batch was cancelled
    Cancelled,
}

/// Per-item outcomes of a batch, in snapshot order.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    /// Whether the batch ended cancelled (Stop decision or external abort)
    pub cancelled: bool,
}

impl BatchReport {
    pub fn generated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Generated))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Skipped(_)))
            .count()
    }

    pub fn unstarted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Cancelled))
            .count()
    }
}

/// Drives one batch of captioning work.
pub struct Orchestrator {
    client: Arc<dyn CaptionClient>,
    coordinator: Arc<ErrorEscalationCoordinator>,
    cancel: CancelFlag,
    options: BatchOptions,
}

impl Orchestrator {
    pub fn new(
        client: Box<dyn CaptionClient>,
        handler: Arc<dyn DecisionHandler>,
        options: BatchOptions,
    ) -> Self {
        let cancel = CancelFlag::new();
        let coordinator = Arc::new(ErrorEscalationCoordinator::new(handler, cancel.clone()));
        Self {
            client: Arc::from(client),
            coordinator,
            cancel,
            options,
        }
    }

    /// Handle the host can use to abort the batch from outside.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Caption every item in the snapshot.
    ///
    /// `on_item` is called with the snapshot index as each item completes,
    /// letting the host tick progress in real time. Entry order of the
    /// returned outcomes always matches the snapshot, regardless of the
    /// order parallel work finished in.
    pub async fn run_batch<F>(
        &self,
        items: &[Arc<CaptionItem>],
        prompt: &str,
        on_item: F,
    ) -> BatchReport
    where
        F: Fn(usize, &ItemOutcome) + Send + Sync + 'static,
    {
        let report = if self.options.workers <= 1 {
            self.run_sequential(items, prompt, &on_item).await
        } else {
            self.run_parallel(items, prompt, on_item).await
        };

        debug_assert!(items.iter().all(|item| !item.is_processing()));
        tracing::info!(
            "Batch finished: {} generated, {} skipped, {} not started",
            report.generated(),
            report.skipped(),
            report.unstarted()
        );
        report
    }

    async fn run_sequential<F>(
        &self,
        items: &[Arc<CaptionItem>],
        prompt: &str,
        on_item: &F,
    ) -> BatchReport
    where
        F: Fn(usize, &ItemOutcome),
    {
        let mut outcomes = vec![ItemOutcome::Cancelled; items.len()];

        for (i, item) in items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let outcome = caption_one(
                &self.client,
                &self.coordinator,
                item,
                prompt,
                &self.options,
            )
            .await;
            on_item(i, &outcome);
            outcomes[i] = outcome;
        }

        BatchReport {
            outcomes,
            cancelled: self.cancel.is_cancelled(),
        }
    }

    async fn run_parallel<F>(
        &self,
        items: &[Arc<CaptionItem>],
        prompt: &str,
        on_item: F,
    ) -> BatchReport
    where
        F: Fn(usize, &ItemOutcome) + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.workers));
        let on_item = Arc::new(on_item);
        let prompt: Arc<str> = Arc::from(prompt);
        let mut handles = Vec::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!("Batch semaphore closed unexpectedly — stopping dispatch");
                    break;
                }
            };

            // Cancellation takes effect between items: in-flight requests
            // finish, undispatched ones never start.
            if self.cancel.is_cancelled() {
                break;
            }

            let client = self.client.clone();
            let coordinator = self.coordinator.clone();
            let options = self.options.clone();
            let item = item.clone();
            let prompt = prompt.clone();
            let on_item = on_item.clone();

            handles.push(tokio::spawn(async move {
                let outcome = caption_one(&client, &coordinator, &item, &prompt, &options).await;
                drop(permit); // Release concurrency slot before the callback
                on_item(i, &outcome);
                (i, outcome)
            }));
        }

        let mut outcomes = vec![ItemOutcome::Cancelled; items.len()];
        for handle in handles {
            match handle.await {
                Ok((i, outcome)) => outcomes[i] = outcome,
                Err(e) => tracing::error!("Caption task panicked: {e}"),
            }
        }

        BatchReport {
            outcomes,
            cancelled: self.cancel.is_cancelled(),
        }
    }
}

/// Caption a single item, escalating any failure.
///
/// The processing guard covers every exit path, so the item's in-flight
/// flag is reset no matter how this returns.
async fn caption_one(
    client: &Arc<dyn CaptionClient>,
    coordinator: &ErrorEscalationCoordinator,
    item: &Arc<CaptionItem>,
    prompt: &str,
    options: &BatchOptions,
) -> ItemOutcome {
    let _guard = item.begin_processing();

    match generate(client, item, prompt, options).await {
        Ok(caption) => {
            item.apply_generated(caption, options.caption_policy);
            ItemOutcome::Generated
        }
        Err(e) => {
            let message = e.to_string();
            // Stop is applied inside the coordinator (shared cancel flag);
            // either way this item's caption stays untouched.
            let decision = coordinator.escalate(&message).await;
            if decision == Decision::Stop {
                tracing::debug!("Stop decision for {:?}", item.image_path());
            }
            ItemOutcome::Skipped(message)
        }
    }
}

/// Read the image and request a caption under the configured deadline.
async fn generate(
    client: &Arc<dyn CaptionClient>,
    item: &Arc<CaptionItem>,
    prompt: &str,
    options: &BatchOptions,
) -> Result<String, CaptionError> {
    let bytes = tokio::fs::read(item.image_path())
        .await
        .map_err(|e| CaptionError::ImageRead {
            path: item.image_path().to_path_buf(),
            message: e.to_string(),
        })?;

    match tokio::time::timeout(
        Duration::from_millis(options.timeout_ms),
        client.generate_caption(&bytes, prompt),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(CaptionError::Timeout {
            path: item.image_path().to_path_buf(),
            timeout_ms: options.timeout_ms,
        }),
    }
}
