//! Static site builder for malvolio.
//!
//! Renders category listings and item pages from the content store through
//! minijinja templates and keeps the output directory in sync with what each
//! build produces.

pub mod assets;
pub mod builder;
pub mod output;
pub mod templates;

pub use builder::{BuildConfig, BuildError, BuildReport, SiteBuilder, SkippedPage};
pub use output::{
    OutputError, OutputFileSet, OutputManager, OutputSyncError, SyncFailure, SyncOp, SyncReport,
    WriteStatus,
};
pub use templates::{CategoryListing, RenderError, Renderer, BASE_TEMPLATE};
