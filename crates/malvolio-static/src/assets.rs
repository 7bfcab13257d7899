//! Static assets mirrored into the output tree.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A file under the static directory and where it lands in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticAsset {
    /// Absolute or config-relative source path
    pub source: PathBuf,
    /// Path relative to the output root
    pub relative: PathBuf,
}

/// Find every asset under `static_dir`.
///
/// Dotfiles such as `.nojekyll` or `.well-known/` are published like any
/// other asset. Editor backups, swap files and `.DS_Store` are left out. A
/// missing directory simply has no assets.
pub fn discover_assets(static_dir: &Path) -> Vec<StaticAsset> {
    if !static_dir.is_dir() {
        tracing::debug!("No static directory at {}", static_dir.display());
        return Vec::new();
    }

    let mut assets: Vec<StaticAsset> = WalkDir::new(static_dir)
        .follow_links(true)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("Skipping unreadable static entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && !is_junk(&e.file_name().to_string_lossy()))
        .filter_map(|e| {
            let relative = e.path().strip_prefix(static_dir).ok()?.to_path_buf();
            Some(StaticAsset {
                source: e.path().to_path_buf(),
                relative,
            })
        })
        .collect();

    assets.sort_by(|a, b| a.relative.cmp(&b.relative));
    assets
}

fn is_junk(name: &str) -> bool {
    name == ".DS_Store" || name.ends_with('~') || name.ends_with(".swp") || name.ends_with(".swx")
}
