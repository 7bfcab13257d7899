//! Static site builder.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use malvolio_content::{ContentItem, ContentStore};

use crate::assets::{discover_assets, StaticAsset};
use crate::output::{
    OutputError, OutputFileSet, OutputManager, OutputSyncError, SyncReport, WriteStatus,
};
use crate::templates::{CategoryListing, RenderError, Renderer};

/// Configuration for building a site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory holding `base.html` and the page templates
    pub templates_dir: PathBuf,

    /// Content root with one directory per category
    pub content_dir: PathBuf,

    /// Output directory, fully managed by the build
    pub output_dir: PathBuf,

    /// Assets mirrored unchanged into the output root
    pub static_dir: Option<PathBuf>,

    /// Output subdirectory for item pages
    pub items_dir: String,

    /// Categories to render, in order
    pub categories: Vec<String>,

    /// Standalone pages rendered from `<name>.html` with every category bound
    pub pages: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            content_dir: PathBuf::from("content"),
            output_dir: PathBuf::from("docs"),
            static_dir: Some(PathBuf::from("static")),
            items_dir: "content".to_string(),
            categories: vec!["thought".to_string(), "experience".to_string()],
            pages: vec!["index".to_string(), "music".to_string()],
        }
    }
}

impl BuildConfig {
    /// Source directories whose changes should trigger a rebuild.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.templates_dir.clone(), self.content_dir.clone()];
        paths.extend(self.static_dir.clone());
        paths
    }

    /// Refuse an output directory that overlaps a source directory.
    ///
    /// Everything under the output root that a build does not produce is
    /// deleted, so sources there would be lost.
    pub fn validate(&self) -> Result<(), BuildError> {
        let output = resolve(&self.output_dir);

        for source in self.watch_paths() {
            let resolved = resolve(&source);
            if output.starts_with(&resolved) || resolved.starts_with(&output) {
                return Err(BuildError::OutputOverlapsSource {
                    output: self.output_dir.clone(),
                    source_dir: source,
                });
            }
        }

        Ok(())
    }
}

/// Absolute form of `path` with symlinks resolved as far as it exists.
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

/// A page or category left out of the build.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPage {
    /// Output path, or the category name when a whole category was skipped
    pub page: String,
    /// Why it was skipped
    pub reason: String,
}

/// Result of a build.
#[derive(Debug)]
pub struct BuildReport {
    /// Number of pages rendered and written
    pub pages: usize,

    /// Number of static assets mirrored
    pub assets: usize,

    /// Pages that were skipped, with reasons
    pub skipped: Vec<SkippedPage>,

    /// Output synchronization counts
    pub sync: SyncReport,

    /// Set when some output paths could not be written or deleted
    pub sync_error: Option<OutputSyncError>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildReport {
    /// True when every output path was synchronized.
    pub fn is_synced(&self) -> bool {
        self.sync_error.is_none()
    }
}

/// Errors that stop a build outright.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(
        "Output directory {} overlaps source directory {}",
        output.display(),
        source_dir.display()
    )]
    OutputOverlapsSource { output: PathBuf, source_dir: PathBuf },
}

/// A category with the items whose bodies loaded.
struct LoadedCategory {
    name: String,
    items: Vec<ContentItem>,
}

/// Builds the whole site from scratch on every call.
#[derive(Debug, Clone)]
pub struct SiteBuilder {
    config: BuildConfig,
    store: ContentStore,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: BuildConfig) -> Self {
        let store = ContentStore::new(&config.content_dir);
        Self { config, store }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the site, replacing stale output.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        self.run(false)
    }

    /// Delete all previous output first, then build.
    pub fn build_clean(&self) -> Result<BuildReport, BuildError> {
        self.run(true)
    }

    fn run(&self, clean: bool) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let mut skipped = Vec::new();

        self.config.validate()?;

        let mut output = OutputManager::begin(&self.config.output_dir)?;
        if clean {
            let removed = output.purge()?;
            tracing::info!(
                "Cleaned {} file(s) from {}",
                removed,
                self.config.output_dir.display()
            );
        }

        let categories = self.load_categories(&mut skipped);
        let assets = self
            .config
            .static_dir
            .as_deref()
            .map(discover_assets)
            .unwrap_or_default();
        let standalone = self.standalone_pages(&mut skipped);
        let (files, assets) = self.plan(&standalone, &categories, assets);
        output.declare(files);

        // Fresh per build: templates are re-read from disk.
        let renderer = Renderer::new(&self.config.templates_dir, self.config.items_dir.as_str());
        let listings: Vec<CategoryListing<'_>> = categories
            .iter()
            .map(|c| CategoryListing {
                name: &c.name,
                items: &c.items,
            })
            .collect();

        let mut pages = 0;

        for page in &standalone {
            let template = format!("{}.html", page);
            let rendered = renderer.render_index_page(&template, &listings);
            pages += emit(&mut output, Path::new(&template), rendered, &mut skipped)?;
        }

        for listing in &listings {
            let template = format!("{}.html", listing.name);
            let rendered = renderer.render_index_page(&template, std::slice::from_ref(listing));
            pages += emit(&mut output, Path::new(&template), rendered, &mut skipped)?;
        }

        let items: Vec<&ContentItem> = categories.iter().flat_map(|c| c.items.iter()).collect();
        let rendered: Vec<(PathBuf, Result<String, RenderError>)> = items
            .par_iter()
            .map(|item| (self.item_path(item), renderer.render_item_page(item)))
            .collect();

        for (path, html) in rendered {
            pages += emit(&mut output, &path, html, &mut skipped)?;
        }

        let mut mirrored = 0;
        for asset in &assets {
            mirrored += written(output.copy(&asset.source, &asset.relative))?;
        }

        let (sync, sync_error) = match output.finalize() {
            Ok(report) => (report, None),
            Err(e) => {
                tracing::error!("{}", e);
                (e.report, Some(e))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Built {} page(s) and {} asset(s) in {}ms: {} written, {} unchanged, {} removed, {} skipped",
            pages,
            mirrored,
            duration_ms,
            sync.written,
            sync.unchanged,
            sync.removed,
            skipped.len()
        );

        Ok(BuildReport {
            pages,
            assets: mirrored,
            skipped,
            sync,
            sync_error,
            duration_ms,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Load every configured category and the bodies of its items.
    fn load_categories(&self, skipped: &mut Vec<SkippedPage>) -> Vec<LoadedCategory> {
        let mut loaded = Vec::with_capacity(self.config.categories.len());

        for name in &self.config.categories {
            let category = match self.store.load_category(name) {
                Ok(category) => category,
                Err(e) => {
                    skip(skipped, name.clone(), e.to_string());
                    continue;
                }
            };

            for rejected in category.rejected() {
                skip(
                    skipped,
                    format!("{}/{}", name, rejected.key),
                    format!("invalid metadata entry: {}", rejected.reason),
                );
            }

            let mut items = Vec::with_capacity(category.len());
            for key in category.keys() {
                match self.store.load_item(&category, key) {
                    Ok(item) => items.push(item),
                    Err(e) => skip(
                        skipped,
                        self.item_path_for(name, key).display().to_string(),
                        e.to_string(),
                    ),
                }
            }

            loaded.push(LoadedCategory {
                name: name.clone(),
                items,
            });
        }

        loaded
    }

    /// Standalone pages to render, each at most once.
    ///
    /// A page named like a configured category would write the same file as
    /// that category's listing; the listing wins.
    fn standalone_pages(&self, skipped: &mut Vec<SkippedPage>) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut pages = Vec::with_capacity(self.config.pages.len());

        for page in &self.config.pages {
            if self.config.categories.contains(page) {
                skip(
                    skipped,
                    format!("{}.html", page),
                    format!("standalone page collides with the {} category listing", page),
                );
            } else if seen.insert(page.as_str()) {
                pages.push(page.as_str());
            } else {
                tracing::warn!("Standalone page {} is listed more than once", page);
            }
        }

        pages
    }

    /// Derive the output file set for this build.
    ///
    /// Generated pages take precedence over static assets at the same path.
    fn plan(
        &self,
        pages: &[&str],
        categories: &[LoadedCategory],
        assets: Vec<StaticAsset>,
    ) -> (OutputFileSet, Vec<StaticAsset>) {
        let mut files = OutputFileSet::new();

        for page in pages {
            files.insert(format!("{}.html", page));
        }

        for category in categories {
            files.insert(format!("{}.html", category.name));
            for item in &category.items {
                files.insert(self.item_path(item));
            }
        }

        let assets = assets
            .into_iter()
            .filter(|asset| {
                if files.contains(&asset.relative) {
                    tracing::warn!(
                        "Static asset {} collides with a generated page, ignoring it",
                        asset.source.display()
                    );
                    false
                } else {
                    true
                }
            })
            .collect::<Vec<_>>();

        for asset in &assets {
            files.insert(asset.relative.clone());
        }

        (files, assets)
    }

    fn item_path(&self, item: &ContentItem) -> PathBuf {
        self.item_path_for(&item.category, &item.key)
    }

    fn item_path_for(&self, category: &str, key: &str) -> PathBuf {
        PathBuf::from(&self.config.items_dir)
            .join(category)
            .join(format!("{}.html", key))
    }
}

/// Write a rendered page, or record why it was skipped.
///
/// Returns the number of pages written. Only fatal output errors propagate.
fn emit(
    output: &mut OutputManager,
    path: &Path,
    rendered: Result<String, RenderError>,
    skipped: &mut Vec<SkippedPage>,
) -> Result<usize, BuildError> {
    let html = match rendered {
        Ok(html) => html,
        Err(e) => {
            skip(skipped, path.display().to_string(), e.to_string());
            return Ok(0);
        }
    };

    written(output.write(path, html))
}

/// Count a finished output operation. Non-fatal failures are already
/// recorded by the output manager.
fn written(result: Result<WriteStatus, OutputError>) -> Result<usize, BuildError> {
    match result {
        Ok(_) => Ok(1),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            tracing::warn!("{}", e);
            Ok(0)
        }
    }
}

fn skip(skipped: &mut Vec<SkippedPage>, page: String, reason: String) {
    tracing::warn!("Skipping {}: {}", page, reason);
    skipped.push(SkippedPage { page, reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::{tempdir, TempDir};
    use walkdir::WalkDir;

    const BASE: &str = "<html><body>{% if heading is defined %}<h1>{{ heading }}</h1>{% endif %}{{ content }}</body></html>";
    const LISTING: &str =
        "<ul>{% for item in items %}<li>{{ item.heading }}: {{ item.summary }}</li>{% endfor %}</ul>";
    const HELLO_META: &str =
        "hello:\n  heading: Hello\n  date: \"2024-01-01\"\n  summary: s\n";

    struct Site {
        dir: TempDir,
    }

    impl Site {
        fn new() -> Self {
            let site = Self {
                dir: tempdir().unwrap(),
            };
            site.write("templates/base.html", BASE);
            site
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.path(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn remove(&self, rel: &str) {
            fs::remove_file(self.path(rel)).unwrap();
        }

        fn config(&self, categories: &[&str]) -> BuildConfig {
            BuildConfig {
                templates_dir: self.path("templates"),
                content_dir: self.path("content"),
                output_dir: self.path("docs"),
                static_dir: Some(self.path("static")),
                items_dir: "content".to_string(),
                categories: categories.iter().map(|c| c.to_string()).collect(),
                pages: vec![],
            }
        }

        fn builder(&self, categories: &[&str]) -> SiteBuilder {
            SiteBuilder::new(self.config(categories))
        }

        fn output_files(&self) -> Vec<String> {
            let root = self.path("docs");
            let mut files: Vec<String> = WalkDir::new(&root)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| {
                    e.path()
                        .strip_prefix(&root)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/")
                })
                .collect();
            files.sort();
            files
        }

        fn output(&self, rel: &str) -> String {
            fs::read_to_string(self.path("docs").join(rel)).unwrap()
        }

        fn snapshot(&self) -> Vec<(String, Vec<u8>)> {
            self.output_files()
                .into_iter()
                .map(|f| {
                    let bytes = fs::read(self.path("docs").join(&f)).unwrap();
                    (f, bytes)
                })
                .collect()
        }
    }

    fn hello_site() -> Site {
        let site = Site::new();
        site.write("templates/thought.html", LISTING);
        site.write("content/thought/meta.yaml", HELLO_META);
        site.write("content/thought/hello.html", "<p>Hello body</p>");
        site
    }

    #[test]
    fn single_item_yields_listing_and_item_page() {
        let site = hello_site();

        let report = site.builder(&["thought"]).build().unwrap();

        assert_eq!(
            site.output_files(),
            vec![
                "content/thought/hello.html".to_string(),
                "thought.html".to_string()
            ]
        );
        assert_eq!(report.pages, 2);
        assert!(report.is_synced());

        let listing = site.output("thought.html");
        assert!(listing.contains("Hello: s"));

        let page = site.output("content/thought/hello.html");
        assert_eq!(
            page,
            "<html><body><h1>Hello</h1><p>Hello body</p></body></html>"
        );
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let site = hello_site();
        let builder = site.builder(&["thought"]);

        builder.build().unwrap();
        let first = site.snapshot();
        let report = builder.build().unwrap();
        let second = site.snapshot();

        assert_eq!(first, second);
        assert_eq!(report.sync.written, 0);
        assert_eq!(report.sync.unchanged, 2);
    }

    #[test]
    fn removed_item_is_cleaned_up() {
        let site = hello_site();
        let builder = site.builder(&["thought"]);
        builder.build().unwrap();

        site.write("content/thought/meta.yaml", "");
        site.remove("content/thought/hello.html");
        let report = builder.build().unwrap();

        assert!(!site.path("docs/content/thought/hello.html").exists());
        assert!(!site.path("docs/content").exists());
        assert_eq!(report.sync.removed, 1);
        assert_eq!(site.output_files(), vec!["thought.html".to_string()]);
    }

    #[test]
    fn removing_category_removes_its_pages() {
        let site = hello_site();
        site.builder(&["thought"]).build().unwrap();

        site.builder(&[]).build().unwrap();

        assert!(site.output_files().is_empty());
    }

    #[test]
    fn renamed_item_leaves_no_orphan() {
        let site = hello_site();
        let builder = site.builder(&["thought"]);
        builder.build().unwrap();

        site.write(
            "content/thought/meta.yaml",
            "greeting:\n  heading: Hello\n  date: \"2024-01-01\"\n  summary: s\n",
        );
        site.write("content/thought/greeting.html", "<p>Hello body</p>");
        site.remove("content/thought/hello.html");
        builder.build().unwrap();

        assert_eq!(
            site.output_files(),
            vec![
                "content/thought/greeting.html".to_string(),
                "thought.html".to_string()
            ]
        );
    }

    #[test]
    fn missing_field_skips_only_that_item() {
        let site = Site::new();
        site.write(
            "templates/base.html",
            "{% if heading is defined %}{{ banner.text }}{% endif %}{{ content }}",
        );
        site.write("templates/thought.html", LISTING);
        site.write(
            "content/thought/meta.yaml",
            "good:\n  heading: Good\n  banner:\n    text: hi\nbad:\n  heading: Bad\nalso:\n  heading: Also\n  banner:\n    text: yo\n",
        );
        site.write("content/thought/good.html", "g");
        site.write("content/thought/bad.html", "b");
        site.write("content/thought/also.html", "a");

        let report = site.builder(&["thought"]).build().unwrap();

        assert_eq!(
            site.output_files(),
            vec![
                "content/thought/also.html".to_string(),
                "content/thought/good.html".to_string(),
                "thought.html".to_string()
            ]
        );
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].page, "content/thought/bad.html");
        assert!(site.output("thought.html").contains("Bad"));
    }

    #[test]
    fn malformed_category_does_not_affect_others() {
        let site = hello_site();
        site.write("templates/experience.html", LISTING);
        site.write("content/experience/meta.yaml", "[not, a, mapping]");

        let report = site.builder(&["experience", "thought"]).build().unwrap();

        assert!(site.path("docs/thought.html").exists());
        assert!(site.path("docs/content/thought/hello.html").exists());
        assert!(!site.path("docs/experience.html").exists());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].page, "experience");
    }

    #[test]
    fn malformed_entry_keeps_valid_siblings() {
        let site = hello_site();
        site.write(
            "content/thought/meta.yaml",
            &format!("{}broken: 7\n", HELLO_META),
        );

        let report = site.builder(&["thought"]).build().unwrap();

        assert!(site.path("docs/content/thought/hello.html").exists());
        assert!(site.output("thought.html").contains("Hello"));
        assert_eq!(report.skipped[0].page, "thought/broken");
    }

    #[test]
    fn missing_body_skips_item_and_listing_entry() {
        let site = hello_site();
        site.write(
            "content/thought/meta.yaml",
            &format!("{}ghost:\n  heading: Ghost\n", HELLO_META),
        );

        let report = site.builder(&["thought"]).build().unwrap();

        assert!(!site.path("docs/content/thought/ghost.html").exists());
        assert!(!site.output("thought.html").contains("Ghost"));
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn missing_listing_template_keeps_item_pages() {
        let site = hello_site();
        site.remove("templates/thought.html");

        let report = site.builder(&["thought"]).build().unwrap();

        assert_eq!(
            site.output_files(),
            vec!["content/thought/hello.html".to_string()]
        );
        assert!(report.skipped[0].reason.contains("thought.html"));
    }

    #[test]
    fn renders_standalone_pages_with_all_categories() {
        let site = hello_site();
        site.write(
            "templates/index.html",
            "{% for c in categories %}{{ c.name }}={{ c.items | length }};{% endfor %}",
        );
        let mut config = site.config(&["thought"]);
        config.pages = vec!["index".to_string()];

        SiteBuilder::new(config).build().unwrap();

        assert!(site.output("index.html").contains("thought=1;"));
    }

    #[test]
    fn mirrors_static_assets_and_drops_removed_ones() {
        let site = hello_site();
        site.write("static/css/site.css", "body { margin: 0 }");
        site.write("static/old.js", "console.log(1)");
        let builder = site.builder(&["thought"]);
        builder.build().unwrap();

        assert_eq!(site.output("css/site.css"), "body { margin: 0 }");

        site.remove("static/old.js");
        let report = builder.build().unwrap();

        assert!(!site.path("docs/old.js").exists());
        assert_eq!(report.assets, 1);
    }

    #[test]
    fn clean_build_rewrites_everything() {
        let site = hello_site();
        let builder = site.builder(&["thought"]);
        builder.build().unwrap();
        site.write("docs/stray.txt", "left behind");

        let report = builder.build_clean().unwrap();

        assert_eq!(report.sync.written, 2);
        assert_eq!(report.sync.unchanged, 0);
        assert!(!site.path("docs/stray.txt").exists());
    }

    #[test]
    fn output_at_site_root_is_refused_before_touching_sources() {
        let site = hello_site();
        let mut config = site.config(&["thought"]);
        config.output_dir = site.dir.path().to_path_buf();

        let result = SiteBuilder::new(config).build();

        assert!(matches!(
            result,
            Err(BuildError::OutputOverlapsSource { .. })
        ));
        assert!(site.path("templates/base.html").exists());
        assert!(site.path("content/thought/meta.yaml").exists());
    }

    #[test]
    fn output_inside_a_source_dir_is_refused() {
        let site = hello_site();
        let mut config = site.config(&["thought"]);
        config.output_dir = site.path("content/public");

        let result = SiteBuilder::new(config).build();

        assert!(matches!(
            result,
            Err(BuildError::OutputOverlapsSource { .. })
        ));
        assert!(!site.path("content/public").exists());
    }

    #[test]
    fn relative_paths_are_compared_after_resolution() {
        let site = hello_site();
        let mut config = site.config(&["thought"]);
        config.output_dir = site.path("templates/../content");

        assert!(config.validate().is_err());

        config.output_dir = site.path("docs");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn mirrors_dotfiles_but_not_editor_junk() {
        let site = hello_site();
        site.write("static/.nojekyll", "");
        site.write("static/.well-known/x", "token");
        site.write("static/site.css", "body{}");
        site.write("static/site.css~", "backup");
        site.write("static/.site.css.swp", "swap");

        site.builder(&["thought"]).build().unwrap();

        assert!(site.path("docs/.nojekyll").exists());
        assert_eq!(site.output(".well-known/x"), "token");
        assert!(site.path("docs/site.css").exists());
        assert!(!site.path("docs/site.css~").exists());
        assert!(!site.path("docs/.site.css.swp").exists());
    }

    #[test]
    fn dotfiles_survive_a_rebuild() {
        let site = hello_site();
        site.write("static/.nojekyll", "");
        let builder = site.builder(&["thought"]);
        builder.build().unwrap();

        let report = builder.build().unwrap();

        assert!(site.path("docs/.nojekyll").exists());
        assert_eq!(report.sync.removed, 0);
        assert_eq!(report.assets, 1);
    }

    #[test]
    fn standalone_page_named_like_a_category_yields_to_the_listing() {
        let site = hello_site();
        let mut config = site.config(&["thought"]);
        config.pages = vec!["thought".to_string()];

        let report = SiteBuilder::new(config).build().unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].page, "thought.html");
        assert!(site.output("thought.html").contains("Hello: s"));
    }

    #[test]
    fn default_pages_include_music() {
        assert_eq!(BuildConfig::default().pages, vec!["index", "music"]);
    }

    #[test]
    fn fatal_output_errors_stop_the_build() {
        let fatal = OutputError::Fatal {
            path: PathBuf::from("docs/index.html"),
            source: std::io::Error::from(std::io::ErrorKind::StorageFull),
        };
        let collected = OutputError::Io {
            path: PathBuf::from("docs/index.html"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };

        assert!(matches!(
            written(Err(fatal)),
            Err(BuildError::Output(OutputError::Fatal { .. }))
        ));
        assert_eq!(written(Err(collected)).unwrap(), 0);
        assert_eq!(written(Ok(WriteStatus::Unchanged)).unwrap(), 1);
    }
}
