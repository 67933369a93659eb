//! Caption items and the ordered set the batch operates on.
//!
//! A `CaptionItem` is one image plus its caption state. Items are shared as
//! `Arc<CaptionItem>` between the orchestrator's workers and the exporters;
//! each field is only ever written by the worker currently assigned to the
//! item, so the interior mutex is uncontended in practice.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// What to do with a freshly generated caption.
///
/// The default treats generated text as new, unsaved content: it updates the
/// current caption but leaves the persisted value alone, so the item shows as
/// modified until an export saves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratedCaptionPolicy {
    /// Generated captions await an explicit export/save step
    #[default]
    MarkModified,
    /// Generated captions count as already saved
    MarkPersisted,
}

/// Mutable caption text, guarded as one unit so `caption` and `persisted`
/// are always observed consistently.
#[derive(Default)]
struct CaptionText {
    caption: String,
    persisted: String,
}

/// One unit of captioning work: an image path plus its caption state.
pub struct CaptionItem {
    image_path: PathBuf,
    extension: &'static str,
    processing: AtomicBool,
    text: Mutex<CaptionText>,
}

impl CaptionItem {
    /// Create an item for an image with its canonical extension.
    pub fn new(image_path: impl Into<PathBuf>, extension: &'static str) -> Self {
        Self {
            image_path: image_path.into(),
            extension,
            processing: AtomicBool::new(false),
            text: Mutex::new(CaptionText::default()),
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Canonical extension including the leading dot, e.g. `.jpg`.
    ///
    /// Fixed at creation so archive entry naming never re-derives it from
    /// the path.
    pub fn extension(&self) -> &'static str {
        self.extension
    }

    /// Sibling path the loose exporter writes the caption to.
    pub fn caption_path(&self) -> PathBuf {
        self.image_path.with_extension("txt")
    }

    fn text(&self) -> MutexGuard<'_, CaptionText> {
        // A poisoned lock only means a worker panicked mid-write; the text
        // itself is still a valid String, so recover it.
        self.text.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current caption text.
    pub fn caption(&self) -> String {
        self.text().caption.clone()
    }

    /// Run `f` against the current caption without cloning it.
    pub fn with_caption<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.text().caption)
    }

    /// Replace the caption (user-edit path): current text only.
    pub fn set_caption(&self, caption: impl Into<String>) {
        self.text().caption = caption.into();
    }

    /// Apply a model-generated caption according to the active policy.
    pub fn apply_generated(&self, caption: String, policy: GeneratedCaptionPolicy) {
        let mut text = self.text();
        text.caption = caption;
        if policy == GeneratedCaptionPolicy::MarkPersisted {
            text.persisted = text.caption.clone();
        }
    }

    /// Record that the current caption has been durably saved.
    pub fn mark_persisted(&self) {
        let mut text = self.text();
        text.persisted = text.caption.clone();
    }

    /// Whether the current caption differs from the last saved value.
    pub fn is_modified(&self) -> bool {
        let text = self.text();
        text.caption != text.persisted
    }

    /// Whether a generation request is currently in flight for this item.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Mark the item as in flight; the returned guard resets the flag when
    /// dropped, covering every exit path including panics.
    pub fn begin_processing(self: &Arc<Self>) -> ProcessingGuard {
        self.processing.store(true, Ordering::SeqCst);
        ProcessingGuard { item: self.clone() }
    }
}

impl std::fmt::Debug for CaptionItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionItem")
            .field("image_path", &self.image_path)
            .field("extension", &self.extension)
            .field("processing", &self.is_processing())
            .finish()
    }
}

/// RAII guard that clears an item's processing flag on drop.
pub struct ProcessingGuard {
    item: Arc<CaptionItem>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.item.processing.store(false, Ordering::SeqCst);
    }
}

/// The ordered collection of caption items in a session.
#[derive(Default)]
pub struct ItemSet {
    items: Vec<Arc<CaptionItem>>,
}

impl ItemSet {
    pub fn new(items: Vec<Arc<CaptionItem>>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<CaptionItem>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CaptionItem>> {
        self.items.iter()
    }

    /// Materialize a stable snapshot for one batch run.
    ///
    /// The orchestrator and exporters iterate this snapshot, never the live
    /// set, so the collection the host observes can change without racing
    /// the batch's own indexing.
    pub fn snapshot(&self) -> Vec<Arc<CaptionItem>> {
        self.items.clone()
    }
}

impl FromIterator<Arc<CaptionItem>> for ItemSet {
    fn from_iter<I: IntoIterator<Item = Arc<CaptionItem>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_is_clean() {
        let item = CaptionItem::new("/photos/a.jpg", ".jpg");
        assert_eq!(item.caption(), "");
        assert!(!item.is_modified());
        assert!(!item.is_processing());
    }

    #[test]
    fn test_generated_caption_marks_modified_by_default() {
        let item = CaptionItem::new("/photos/a.jpg", ".jpg");
        item.apply_generated("a red fox".to_string(), GeneratedCaptionPolicy::MarkModified);
        assert_eq!(item.caption(), "a red fox");
        assert!(item.is_modified());
    }

    #[test]
    fn test_generated_caption_mark_persisted_policy() {
        let item = CaptionItem::new("/photos/a.jpg", ".jpg");
        item.apply_generated("a red fox".to_string(), GeneratedCaptionPolicy::MarkPersisted);
        assert_eq!(item.caption(), "a red fox");
        assert!(!item.is_modified());
    }

    #[test]
    fn test_mark_persisted_clears_modified() {
        let item = CaptionItem::new("/photos/a.jpg", ".jpg");
        item.set_caption("edited by hand");
        assert!(item.is_modified());
        item.mark_persisted();
        assert!(!item.is_modified());
    }

    #[test]
    fn test_processing_guard_resets_on_drop() {
        let item = Arc::new(CaptionItem::new("/photos/a.jpg", ".jpg"));
        {
            let _guard = item.begin_processing();
            assert!(item.is_processing());
        }
        assert!(!item.is_processing());
    }

    #[test]
    fn test_processing_guard_resets_on_panic() {
        let item = Arc::new(CaptionItem::new("/photos/a.jpg", ".jpg"));
        let cloned = item.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.begin_processing();
            panic!("worker died");
        });
        assert!(result.is_err());
        assert!(!item.is_processing());
    }

    #[test]
    fn test_caption_path_replaces_extension() {
        let item = CaptionItem::new("/photos/cat.jpeg", ".jpeg");
        assert_eq!(item.caption_path(), PathBuf::from("/photos/cat.txt"));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let set: ItemSet = (0..3)
            .map(|i| Arc::new(CaptionItem::new(format!("/photos/{i}.png"), ".png")))
            .collect();
        let snapshot = set.snapshot();
        assert_eq!(snapshot.len(), 3);
        // Snapshot shares the same items, not copies
        snapshot[0].set_caption("shared");
        assert_eq!(set.get(0).unwrap().caption(), "shared");
    }
}
