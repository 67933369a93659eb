//! Capgen Core - batch image captioning pipeline and dataset exporter.
//!
//! Capgen takes a folder of images, drives a configurable degree of
//! concurrency against a vision-language-model endpoint, and persists the
//! resulting captions either as loose sibling text files or as a single
//! dataset archive with deterministic entry names.
//!
//! # Architecture
//!
//! ```text
//! Folder → Scan/Classify → ItemSet → Orchestrator ⇄ CaptionClient
//!                                        │
//!                                        └→ Archive / Loose export
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use capgen_core::{build_client, scan_folder, AutoSkip, BatchOptions, Orchestrator, Settings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> capgen_core::Result<()> {
//!     let settings = Settings::load()?;
//!     let template = settings.find_template("booru")?;
//!     let endpoint = settings.find_endpoint(&template.endpoint)?;
//!
//!     let client = build_client(endpoint, reqwest::Client::new());
//!     let orchestrator = Orchestrator::new(client, Arc::new(AutoSkip), BatchOptions::default());
//!
//!     let items = scan_folder("./photos".as_ref())?.snapshot();
//!     let report = orchestrator
//!         .run_batch(&items, &settings.resolved_prompt(template), |_, _| {})
//!         .await;
//!     println!("generated {} captions", report.generated());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod item;
pub mod scan;
pub mod vlm;

// Re-exports for convenient access
pub use batch::{
    AutoSkip, AutoStop, BatchOptions, BatchReport, CancelFlag, Decision, DecisionHandler,
    ErrorEscalationCoordinator, ItemOutcome, Orchestrator,
};
pub use config::{BatchConfig, Endpoint, PromptTemplate, ProviderKind, Settings};
pub use error::{CapgenError, CaptionError, CaptionResult, ConfigError, Result};
pub use export::{write_captions, write_dataset, write_dataset_file, DEFAULT_EXPORT_FANOUT};
pub use item::{CaptionItem, GeneratedCaptionPolicy, ItemSet};
pub use scan::{canonical_extension, scan_folder, SUPPORTED_EXTENSIONS};
pub use vlm::{build_client, CaptionClient};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
