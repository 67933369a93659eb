//! Loose caption export: one `.txt` sibling per image.
//!
//! Purely I/O-bound with no rate-limited backend behind it, so the fan-out
//! defaults wider than the captioning pool and there is no shared
//! cancellation: one item's failure never touches its siblings.

use crate::error::{CaptionError, CaptionResult};
use crate::item::CaptionItem;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default number of concurrent caption file writes.
pub const DEFAULT_EXPORT_FANOUT: usize = 8;

/// Write every item's caption next to its image, in parallel.
///
/// Returns one result per item in snapshot order. Each success marks its
/// item persisted independently.
pub async fn write_captions(
    items: &[Arc<CaptionItem>],
    fanout: usize,
) -> Vec<CaptionResult<()>> {
    let semaphore = Arc::new(Semaphore::new(fanout.max(1)));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        // The semaphore is never closed, so acquisition only limits fan-out
        let permit = semaphore.clone().acquire_owned().await.ok();
        let item = item.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            write_one(&item).await
        }));
    }

    items
        .iter()
        .zip(join_all(handles).await)
        .map(|(item, joined)| match joined {
            Ok(result) => result,
            Err(e) => Err(CaptionError::CaptionWrite {
                path: item.caption_path(),
                message: format!("write task panicked: {e}"),
            }),
        })
        .collect()
}

async fn write_one(item: &Arc<CaptionItem>) -> CaptionResult<()> {
    let path = item.caption_path();
    let bytes = item.caption().into_bytes();
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| CaptionError::CaptionWrite {
            path: path.clone(),
            message: e.to_string(),
        })?;
    item.mark_persisted();
    tracing::debug!("Wrote caption {path:?}");
    Ok(())
}
