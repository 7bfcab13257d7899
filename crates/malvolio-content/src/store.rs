//! Reading categories and item bodies from the content tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pulldown_cmark::{html, Options, Parser};

use crate::category::{ContentCategory, ContentItem};
use crate::metadata::parse_metadata;

/// Name of the per-category metadata file.
pub const METADATA_FILE: &str = "meta.yaml";

/// Errors that can occur while reading content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Content not found: {}", .0.display())]
    ContentNotFound(PathBuf),

    #[error("Malformed metadata in {}: {message}", path.display())]
    MalformedMetadata { path: PathBuf, message: String },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read-only view of the content directory.
///
/// Nothing is cached: every call goes to the filesystem, so a rebuild always
/// sees the current sources.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at the content directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a category's metadata file.
    pub fn metadata_path(&self, category: &str) -> PathBuf {
        self.root.join(category).join(METADATA_FILE)
    }

    /// Load a category's metadata.
    ///
    /// Entries that cannot be parsed are recorded on the returned category
    /// as rejected instead of failing the whole category.
    pub fn load_category(&self, name: &str) -> Result<ContentCategory, ContentError> {
        let path = self.metadata_path(name);
        let source = read_source(&path)?;

        let entries = parse_metadata(&source).map_err(|e| ContentError::MalformedMetadata {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if entries.is_empty() {
            tracing::warn!("{} is empty, category has no items", path.display());
        }

        let mut category = ContentCategory::new(name);
        for (key, parsed) in entries {
            match parsed {
                Ok(metadata) => {
                    category.push(key, metadata);
                }
                Err(e) => category.reject(key, e.to_string()),
            }
        }

        Ok(category)
    }

    /// Load the body of one item.
    ///
    /// Looks for `<key>.html` first, then `<key>.md`, which is rendered to HTML.
    pub fn load_item_body(&self, category: &str, key: &str) -> Result<String, ContentError> {
        let dir = self.root.join(category);

        let html_path = dir.join(format!("{}.html", key));
        match read_source(&html_path) {
            Ok(body) => return Ok(body),
            Err(ContentError::ContentNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let md_path = dir.join(format!("{}.md", key));
        match read_source(&md_path) {
            Ok(source) => Ok(render_markdown(&source)),
            Err(ContentError::ContentNotFound(_)) => Err(ContentError::ContentNotFound(html_path)),
            Err(e) => Err(e),
        }
    }

    /// Load an item's body and pair it with its metadata.
    pub fn load_item(
        &self,
        category: &ContentCategory,
        key: &str,
    ) -> Result<ContentItem, ContentError> {
        let metadata = category.get(key).cloned().ok_or_else(|| {
            ContentError::ContentNotFound(self.metadata_path(category.name()).join(key))
        })?;

        let body = self.load_item_body(category.name(), key)?;

        Ok(ContentItem {
            category: category.name().to_string(),
            key: key.to_string(),
            metadata,
            body,
        })
    }
}

fn read_source(path: &Path) -> Result<String, ContentError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ContentError::ContentNotFound(path.to_path_buf()),
        _ => ContentError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

fn render_markdown(content: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(content, options);

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}
