//! Dataset archive export.
//!
//! Streams every item into one zip with deterministic, zero-padded entry
//! names: `{index}{ext}` for the image, `{index}.txt` for the caption, in
//! snapshot order. Images go in uncompressed (they are already compressed
//! formats); captions use the fastest deflate level since they are short.

use crate::error::{CaptionError, CaptionResult};
use crate::item::CaptionItem;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Buffer size for the destination stream; tuned for large sequential writes.
const WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// Chunk size for streaming images from disk into the archive.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Width of the zero-padded entry index: at least 3 digits, growing with
/// the item count (`000..011` for 12 items, `0000..1499` for 1500).
pub fn entry_index_len(item_count: usize) -> usize {
    let max_index = item_count.saturating_sub(1);
    let digits = if max_index == 0 {
        1
    } else {
        max_index.ilog10() as usize + 1
    };
    digits.max(3)
}

fn archive_err(e: impl std::fmt::Display) -> CaptionError {
    CaptionError::Archive {
        message: e.to_string(),
    }
}

/// Write all items into a dataset archive on `writer`.
///
/// Any failure mid-archive aborts the whole export; a partially written
/// archive is never a success state. Items completed before the failure
/// keep their persisted mark — no rollback of the destination is attempted.
pub fn write_dataset<W: Write + Seek>(
    items: &[Arc<CaptionItem>],
    writer: W,
) -> CaptionResult<()> {
    let mut zip = ZipWriter::new(writer);
    let index_len = entry_index_len(items.len());

    let image_options: FileOptions =
        FileOptions::default().compression_method(CompressionMethod::Stored);
    let caption_options: FileOptions = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(1));

    let mut copy_buf = vec![0u8; COPY_BUFFER_SIZE];

    for (i, item) in items.iter().enumerate() {
        let image_name = format!("{i:0index_len$}{}", item.extension());
        zip.start_file(image_name, image_options)
            .map_err(archive_err)?;

        // Stream the image from disk; never buffer the whole file
        let mut file = File::open(item.image_path()).map_err(archive_err)?;
        loop {
            let n = file.read(&mut copy_buf).map_err(archive_err)?;
            if n == 0 {
                break;
            }
            zip.write_all(&copy_buf[..n]).map_err(archive_err)?;
        }

        let caption_name = format!("{i:0index_len$}.txt");
        zip.start_file(caption_name, caption_options)
            .map_err(archive_err)?;
        item.with_caption(|caption| zip.write_all(caption.as_bytes()))
            .map_err(archive_err)?;

        item.mark_persisted();
    }

    zip.finish().map_err(archive_err)?;
    Ok(())
}

/// Open `path` once, wrap it in a large buffered writer, and export into it.
pub fn write_dataset_file(items: &[Arc<CaptionItem>], path: &Path) -> CaptionResult<()> {
    let file = File::create(path).map_err(archive_err)?;
    let writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    write_dataset(items, writer)?;
    tracing::info!("Wrote dataset archive with {} items to {path:?}", items.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::ZipArchive;

    fn make_items(dir: &tempfile::TempDir, count: usize) -> Vec<Arc<CaptionItem>> {
        (0..count)
            .map(|i| {
                let ext = if i % 2 == 0 { ".jpg" } else { ".png" };
                let path = dir.path().join(format!("photo_{i}{ext}"));
                std::fs::write(&path, format!("image-bytes-{i}")).unwrap();
                let item = Arc::new(CaptionItem::new(path, ext));
                item.set_caption(format!("caption {i}"));
                item
            })
            .collect()
    }

    #[test]
    fn test_entry_index_len_padding() {
        assert_eq!(entry_index_len(0), 3);
        assert_eq!(entry_index_len(1), 3);
        assert_eq!(entry_index_len(12), 3);
        assert_eq!(entry_index_len(999), 3);
        assert_eq!(entry_index_len(1000), 3);
        assert_eq!(entry_index_len(1001), 4);
        assert_eq!(entry_index_len(1500), 4);
        assert_eq!(entry_index_len(100_000), 5);
    }

    #[test]
    fn test_entry_names_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let items = make_items(&dir, 12);
        let mut cursor = Cursor::new(Vec::new());
        write_dataset(&items, &mut cursor).unwrap();

        let mut archive = ZipArchive::new(cursor).unwrap();
        let mut names = Vec::new();
        for i in 0..archive.len() {
            names.push(archive.by_index(i).unwrap().name().to_string());
        }
        assert_eq!(names[0], "000.jpg");
        assert_eq!(names[1], "000.txt");
        assert_eq!(names[2], "001.png");
        assert_eq!(names[3], "001.txt");
        assert_eq!(names[22], "011.jpg");
        assert_eq!(names[23], "011.txt");
    }

    #[test]
    fn test_round_trip_preserves_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let items = make_items(&dir, 4);
        let mut cursor = Cursor::new(Vec::new());
        write_dataset(&items, &mut cursor).unwrap();

        let mut archive = ZipArchive::new(cursor).unwrap();
        for (i, item) in items.iter().enumerate() {
            let mut image = Vec::new();
            archive
                .by_name(&format!("{i:03}{}", item.extension()))
                .unwrap()
                .read_to_end(&mut image)
                .unwrap();
            assert_eq!(image, format!("image-bytes-{i}").into_bytes());

            let mut caption = String::new();
            archive
                .by_name(&format!("{i:03}.txt"))
                .unwrap()
                .read_to_string(&mut caption)
                .unwrap();
            assert_eq!(caption, format!("caption {i}"));
        }
    }

    #[test]
    fn test_compression_policy() {
        let dir = tempfile::tempdir().unwrap();
        let items = make_items(&dir, 1);
        let mut cursor = Cursor::new(Vec::new());
        write_dataset(&items, &mut cursor).unwrap();

        let mut archive = ZipArchive::new(cursor).unwrap();
        assert_eq!(
            archive.by_name("000.jpg").unwrap().compression(),
            CompressionMethod::Stored
        );
        assert_eq!(
            archive.by_name("000.txt").unwrap().compression(),
            CompressionMethod::Deflated
        );
    }

    #[test]
    fn test_export_marks_items_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let items = make_items(&dir, 3);
        assert!(items.iter().all(|i| i.is_modified()));

        write_dataset(&items, Cursor::new(Vec::new())).unwrap();
        assert!(items.iter().all(|i| !i.is_modified()));
    }

    #[test]
    fn test_missing_image_aborts_whole_export() {
        let dir = tempfile::tempdir().unwrap();
        let items = make_items(&dir, 3);
        std::fs::remove_file(items[1].image_path()).unwrap();

        let result = write_dataset(&items, Cursor::new(Vec::new()));
        assert!(matches!(result, Err(CaptionError::Archive { .. })));
        // Item 0 completed before the failure and stays persisted;
        // the failing item and everything after it do not
        assert!(!items[0].is_modified());
        assert!(items[1].is_modified());
        assert!(items[2].is_modified());
    }

    #[test]
    fn test_write_dataset_file() {
        let dir = tempfile::tempdir().unwrap();
        let items = make_items(&dir, 2);
        let dest = dir.path().join("dataset.zip");
        write_dataset_file(&items, &dest).unwrap();

        let archive = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 4);
    }

    #[test]
    fn test_1500_items_use_four_digit_padding() {
        // Naming only; items beyond the first two are never opened because
        // the export aborts on the first missing image
        let dir = tempfile::tempdir().unwrap();
        let mut items = make_items(&dir, 2);
        for i in 2..1500 {
            items.push(Arc::new(CaptionItem::new(
                dir.path().join(format!("missing_{i}.jpg")),
                ".jpg",
            )));
        }
        let mut cursor = Cursor::new(Vec::new());
        let result = write_dataset(&items, &mut cursor);
        assert!(result.is_err());

        // The entries written before the abort already carry 4-digit names
        let data = cursor.into_inner();
        let hit = data
            .windows(8)
            .any(|w| w == b"0000.jpg" || w == b"0000.png");
        assert!(hit, "expected 4-digit padded first entry name");
    }
}
