//! Extension classification and folder scanning.

use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::Result;
use crate::item::{CaptionItem, ItemSet};

/// Canonical extensions the pipeline accepts, with the leading dot.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".bmp"];

/// Match a candidate extension (leading dot included) against the allow-list.
///
/// Returns the canonical lower-case literal on a match, so every item holds
/// an interned `&'static str` instead of a fresh allocation per file.
/// ASCII-case-insensitive only; file extensions are not locale-sensitive.
pub fn canonical_extension(extension: &str) -> Option<&'static str> {
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|canonical| extension.eq_ignore_ascii_case(canonical))
        .copied()
}

/// Classify a path by its file name's extension.
fn classify(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_str()?;
    let dot = name.rfind('.')?;
    canonical_extension(&name[dot..])
}

/// Scan a folder (non-recursive) for supported images, in path order.
///
/// Unreadable entries are skipped rather than failing the scan.
pub fn scan_folder(folder: &Path) -> Result<ItemSet> {
    if !folder.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a folder: {}", folder.display()),
        )
        .into());
    }

    let mut paths: Vec<_> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| classify(e.path()).map(|ext| (e.into_path(), ext)))
        .collect();

    // Sort by path for deterministic item order
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    tracing::debug!("Discovered {} supported images in {folder:?}", paths.len());

    Ok(paths
        .into_iter()
        .map(|(path, ext)| Arc::new(CaptionItem::new(path, ext)))
        .collect())
}
