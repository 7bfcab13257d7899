//! Content categories and items.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::metadata::ItemMetadata;

/// Average reading speed used for reading time estimates.
const WORDS_PER_MINUTE: f64 = 220.0;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static tag pattern"));

/// A metadata entry that was dropped while loading a category.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntry {
    /// Item key as written in the metadata file
    pub key: String,
    /// Human readable reason
    pub reason: String,
}

/// A named group of content items, in metadata file order.
#[derive(Debug, Clone, Default)]
pub struct ContentCategory {
    name: String,
    keys: Vec<String>,
    items: HashMap<String, ItemMetadata>,
    rejected: Vec<RejectedEntry>,
}

impl ContentCategory {
    /// Create an empty category.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append an item. Returns `false` if the key is already present.
    pub fn push(&mut self, key: impl Into<String>, metadata: ItemMetadata) -> bool {
        let key = key.into();
        if self.items.contains_key(&key) {
            return false;
        }
        self.keys.push(key.clone());
        self.items.insert(key, metadata);
        true
    }

    /// Record an entry that could not be loaded.
    pub fn reject(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.rejected.push(RejectedEntry {
            key: key.into(),
            reason: reason.into(),
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Item keys in metadata file order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<&ItemMetadata> {
        self.items.get(key)
    }

    /// Iterate over `(key, metadata)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemMetadata)> {
        self.keys
            .iter()
            .filter_map(|k| self.items.get(k).map(|m| (k.as_str(), m)))
    }

    pub fn rejected(&self) -> &[RejectedEntry] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// An item's metadata paired with its loaded body.
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// Owning category name
    pub category: String,
    /// Item key, unique within the category
    pub key: String,
    /// Metadata from `meta.yaml`
    pub metadata: ItemMetadata,
    /// Raw body markup
    pub body: String,
}

impl ContentItem {
    /// Estimated reading time in whole minutes, never less than one.
    pub fn reading_time(&self) -> u32 {
        let text = TAG_PATTERN.replace_all(&self.body, "");
        let words = text.split_whitespace().count() as f64;
        (words / WORDS_PER_MINUTE).round().max(1.0) as u32
    }
}
