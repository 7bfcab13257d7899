//! Content store for malvolio sites.
//!
//! Reads per-category metadata (`meta.yaml`) and item bodies from a content
//! directory. Every read goes straight to disk so each build sees the
//! current sources.

pub mod category;
pub mod metadata;
pub mod store;

pub use category::{ContentCategory, ContentItem, RejectedEntry};
pub use metadata::{parse_metadata, EntryError, ItemMetadata, MetadataError};
pub use store::{ContentError, ContentStore, METADATA_FILE};
