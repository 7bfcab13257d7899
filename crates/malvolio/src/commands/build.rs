//! Static site build command.

use std::path::Path;

use anyhow::Result;
use malvolio_static::SiteBuilder;

use crate::config::{base_dir, ConfigFile};

/// Run the build command.
///
/// Fails when the output could not be fully synchronized, so the process
/// exits nonzero.
pub fn run(config_path: &Path, clean: bool) -> Result<()> {
    let file_config = ConfigFile::load(config_path)?;
    let config = file_config.build_config(&base_dir(config_path));

    tracing::info!("Building site into {}...", config.output_dir.display());

    let builder = SiteBuilder::new(config);
    let result = if clean {
        builder.build_clean()?
    } else {
        builder.build()?
    };

    tracing::info!(
        "Built {} pages in {}ms",
        result.pages,
        result.duration_ms
    );

    if !result.skipped.is_empty() {
        tracing::warn!("{} page(s) skipped, see warnings above", result.skipped.len());
    }

    if let Some(e) = result.sync_error {
        anyhow::bail!(e);
    }

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
