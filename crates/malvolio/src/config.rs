//! Site configuration file (site.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use malvolio_server::DevServerConfig;
use malvolio_static::BuildConfig;
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteSettings,
    #[serde(default)]
    pub serve: ServeSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub templates: String,
    pub content: String,
    pub output: String,
    #[serde(rename = "static")]
    pub static_dir: Option<String>,
    pub items_dir: String,
    pub categories: Vec<String>,
    pub pages: Vec<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        let defaults = BuildConfig::default();
        Self {
            templates: "templates".to_string(),
            content: "content".to_string(),
            output: "docs".to_string(),
            static_dir: Some("static".to_string()),
            items_dir: defaults.items_dir,
            categories: defaults.categories,
            pages: defaults.pages,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
    pub debounce_ms: u64,
}

impl Default for ServeSettings {
    fn default() -> Self {
        let defaults = DevServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
            debounce_ms: defaults.debounce.as_millis() as u64,
        }
    }
}

impl ConfigFile {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Paths are taken relative to the directory holding the config file.
    pub fn build_config(&self, base: &Path) -> BuildConfig {
        let site = &self.site;
        BuildConfig {
            templates_dir: base.join(&site.templates),
            content_dir: base.join(&site.content),
            output_dir: base.join(&site.output),
            static_dir: site.static_dir.as_ref().map(|s| base.join(s)),
            items_dir: site.items_dir.clone(),
            categories: site.categories.clone(),
            pages: site.pages.clone(),
        }
    }

    pub fn server_config(&self) -> DevServerConfig {
        DevServerConfig {
            host: self.serve.host.clone(),
            port: self.serve.port,
            debounce: Duration::from_millis(self.serve.debounce_ms),
            ..Default::default()
        }
    }
}

/// Directory that relative config paths resolve against.
pub fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
