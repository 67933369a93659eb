//! The `capgen caption` command: scan, caption, export.

use anyhow::bail;
use async_trait::async_trait;
use capgen_core::{
    build_client, scan_folder, write_captions, write_dataset_file, AutoSkip, BatchOptions,
    Decision, DecisionHandler, ItemOutcome, Orchestrator, Settings,
};
use clap::Args;
use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the `caption` command.
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Folder of images to caption
    #[arg(required = true)]
    pub folder: PathBuf,

    /// Prompt template name from the settings file
    #[arg(short, long)]
    pub template: String,

    /// Override the worker pool width
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Force strictly sequential processing
    #[arg(long, conflicts_with = "workers")]
    pub sequential: bool,

    /// Package images and captions into a dataset archive at this path
    /// (default: write sidecar .txt files next to each image)
    #[arg(long, value_name = "FILE")]
    pub dataset: Option<PathBuf>,

    /// Skip failed items without prompting
    #[arg(long)]
    pub auto_skip: bool,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Interactive Stop/Skip prompt rendered below the progress bar.
struct PromptDecision {
    progress: ProgressBar,
}

#[async_trait]
impl DecisionHandler for PromptDecision {
    async fn resolve(&self, message: &str) -> Decision {
        let message = message.to_string();
        let progress = self.progress.clone();

        // dialoguer is blocking; keep it off the async workers
        let choice = tokio::task::spawn_blocking(move || {
            progress.suspend(|| {
                eprintln!("{} {message}", style("Captioning failed:").red().bold());
                Select::with_theme(&ColorfulTheme::default())
                    .with_prompt("How do you want to proceed?")
                    .items(&["Skip this image", "Stop the batch"])
                    .default(0)
                    .interact()
                    .unwrap_or(0)
            })
        })
        .await
        .unwrap_or(0);

        if choice == 1 {
            Decision::Stop
        } else {
            Decision::Skip
        }
    }
}

/// Execute the caption command.
pub async fn execute(args: CaptionArgs, settings: Settings) -> anyhow::Result<()> {
    let template = settings.find_template(&args.template)?;
    let endpoint = settings.find_endpoint(&template.endpoint)?;
    let prompt = settings.resolved_prompt(template);

    // One HTTP client, constructed here and injected into the core
    let client = build_client(endpoint, reqwest::Client::new());
    if !client.is_available().await {
        tracing::warn!(
            "Endpoint '{}' ({}) is not responding at {} — requests may fail",
            endpoint.name,
            endpoint.provider,
            endpoint.url
        );
    }

    let set = scan_folder(&args.folder)?;
    if set.is_empty() {
        bail!(
            "No supported images (jpg/jpeg/png/bmp) found in {}",
            args.folder.display()
        );
    }
    println!(
        "{} {} images in {}",
        style("Found").green().bold(),
        set.len(),
        args.folder.display()
    );

    let workers = if args.sequential {
        1
    } else {
        args.workers
            .unwrap_or_else(|| settings.batch.effective_workers())
    };
    let options = BatchOptions {
        workers,
        timeout_ms: args.timeout_ms.unwrap_or(settings.batch.timeout_ms),
        ..Default::default()
    };
    tracing::debug!(
        "Captioning with endpoint '{}', model '{}', {workers} worker(s)",
        endpoint.name,
        endpoint.model
    );

    let snapshot = set.snapshot();
    let progress = ProgressBar::new(snapshot.len() as u64);
    progress.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )?);

    let handler: Arc<dyn DecisionHandler> = if args.auto_skip {
        Arc::new(AutoSkip)
    } else {
        Arc::new(PromptDecision {
            progress: progress.clone(),
        })
    };

    let orchestrator = Orchestrator::new(client, handler, options);
    let bar = progress.clone();
    let report = orchestrator
        .run_batch(&snapshot, &prompt, move |_, outcome| {
            if let ItemOutcome::Skipped(msg) = outcome {
                bar.set_message(format!("last error: {msg}"));
            }
            bar.inc(1);
        })
        .await;
    progress.finish_and_clear();

    println!(
        "{} {} generated, {} skipped, {} not started",
        style("Done:").green().bold(),
        report.generated(),
        report.skipped(),
        report.unstarted()
    );
    if report.cancelled {
        println!(
            "{} batch was stopped early; unsaved captions are kept for completed items",
            style("Note:").yellow().bold()
        );
    }

    match args.dataset {
        Some(dataset) => {
            let items = snapshot.clone();
            let path = dataset.clone();
            // The archive writer is synchronous streaming I/O
            tokio::task::spawn_blocking(move || write_dataset_file(&items, &path)).await??;
            println!(
                "{} dataset archive at {}",
                style("Wrote").green().bold(),
                dataset.display()
            );
        }
        None => {
            let results = write_captions(&snapshot, settings.batch.export_fanout).await;
            let failed = results.iter().filter(|r| r.is_err()).count();
            for err in results.iter().filter_map(|r| r.as_ref().err()) {
                tracing::error!("{err}");
            }
            if failed > 0 {
                bail!(
                    "{failed} of {} caption files could not be written",
                    results.len()
                );
            }
            println!(
                "{} {} caption files",
                style("Wrote").green().bold(),
                results.len()
            );
        }
    }

    Ok(())
}
