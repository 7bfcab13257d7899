//! Development server for malvolio sites.
//!
//! Serves the built output directory, watches the sources and rebuilds the
//! site when they change, then tells connected browsers to reload.

pub mod livereload;
pub mod rebuild;
pub mod server;
pub mod watcher;

pub use livereload::{ReloadHub, ReloadMessage};
pub use rebuild::{LoopState, Rebuild, RebuildLoop, RebuildMachine};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
