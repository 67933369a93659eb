//! Caption persistence: dataset archives and loose sibling files.

pub mod archive;
pub mod loose;

pub use archive::{entry_index_len, write_dataset, write_dataset_file};
pub use loose::{write_captions, DEFAULT_EXPORT_FANOUT};
