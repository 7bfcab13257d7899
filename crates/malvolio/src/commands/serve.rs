//! Development server command.

use std::path::Path;

use anyhow::Result;
use malvolio_server::DevServer;
use malvolio_static::SiteBuilder;

use crate::config::{base_dir, ConfigFile};

/// Options from the command line, overriding the config file.
pub struct ServeOptions {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub watch: bool,
    pub open: bool,
}

/// Run the serve command until interrupted.
pub async fn run(config_path: &Path, options: ServeOptions) -> Result<()> {
    let file_config = ConfigFile::load(config_path)?;
    let builder = SiteBuilder::new(file_config.build_config(&base_dir(config_path)));

    let mut config = file_config.server_config();
    if let Some(port) = options.port {
        config.port = port;
    }
    if let Some(host) = options.host {
        config.host = host;
    }
    config.watch = options.watch;
    config.open = options.open;

    tracing::info!("Starting server on port {}", config.port);

    DevServer::new(config, builder).start().await?;

    Ok(())
}
