//! Malvolio CLI - a minimal static site generator for personal webpages.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "malvolio")]
#[command(about = "A minimal static site generator for personal webpages")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to site.toml config file
    #[arg(short, long, default_value = "site.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site once
    Build {
        /// Delete all previous output before building
        #[arg(long)]
        clean: bool,
    },

    /// Serve the site, rebuilding when sources change
    Serve {
        /// Port to listen on (defaults to config or 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to config or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Serve without watching sources
        #[arg(long)]
        no_watch: bool,

        /// Open the site in a browser
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Build { clean } => {
            commands::build::run(&cli.config, clean)?;
        }
        Commands::Serve {
            port,
            host,
            no_watch,
            open,
        } => {
            let options = commands::serve::ServeOptions {
                port,
                host,
                watch: !no_watch,
                open,
            };
            commands::serve::run(&cli.config, options).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_build_clean() {
        let cli = Cli::try_parse_from(["malvolio", "build", "--clean"]).unwrap();

        assert!(matches!(cli.command, Commands::Build { clean: true }));
        assert_eq!(cli.config, PathBuf::from("site.toml"));
    }

    #[test]
    fn parses_serve_flags() {
        let cli =
            Cli::try_parse_from(["malvolio", "serve", "--port", "9000", "--no-watch"]).unwrap();

        match cli.command {
            Commands::Serve {
                port,
                no_watch,
                open,
                ..
            } => {
                assert_eq!(port, Some(9000));
                assert!(no_watch);
                assert!(!open);
            }
            _ => panic!("expected serve"),
        }
    }
}
