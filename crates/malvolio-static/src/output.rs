//! Output tree synchronization.
//!
//! The output directory is owned by the build. [`OutputManager::begin`]
//! records what is already there, the builder declares the set of files it
//! intends to produce and writes them, and [`OutputManager::finalize`]
//! deletes every earlier file that was not written again. After a build the
//! tree holds exactly what that build produced.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// The files a build is allowed to write, relative to the output root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputFileSet {
    files: BTreeSet<PathBuf>,
}

impl OutputFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a file the build may write.
    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.files.insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Errors from individual output operations.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Path was not declared for this build: {}", .0.display())]
    Undeclared(PathBuf),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Output filesystem unusable at {}: {source}", path.display())]
    Fatal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OutputError {
    /// Whether the build must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OutputError::Fatal { .. })
    }
}

/// Which operation failed on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    Write,
    Copy,
    Delete,
}

/// One failed output operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub path: PathBuf,
    pub op: SyncOp,
    pub message: String,
}

/// Counts from a completed synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files written with new content
    pub written: usize,
    /// Files whose content was already up to date
    pub unchanged: usize,
    /// Stale files deleted
    pub removed: usize,
}

/// One or more output paths could not be written or deleted.
#[derive(Debug, Clone)]
pub struct OutputSyncError {
    pub failures: Vec<SyncFailure>,
    /// What did succeed
    pub report: SyncReport,
}

impl fmt::Display for OutputSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to sync {} output path(s):", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(
                f,
                "{}{} ({:?}: {})",
                sep,
                failure.path.display(),
                failure.op,
                failure.message
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for OutputSyncError {}

/// Outcome of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    Unchanged,
}

/// Tracks the previous and current contents of the output directory.
#[derive(Debug)]
pub struct OutputManager {
    root: PathBuf,
    previous: BTreeSet<PathBuf>,
    declared: OutputFileSet,
    current: BTreeSet<PathBuf>,
    failures: Vec<SyncFailure>,
    report: SyncReport,
}

impl OutputManager {
    /// Start a synchronization pass over `root`, creating it if needed.
    ///
    /// Every file currently under the root is recorded as previous output.
    pub fn begin(root: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| OutputError::Fatal {
            path: root.clone(),
            source: e,
        })?;

        let mut previous = BTreeSet::new();
        for entry in WalkDir::new(&root).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable output entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            if let Ok(relative) = entry.path().strip_prefix(&root) {
                previous.insert(relative.to_path_buf());
            }
        }

        tracing::debug!(
            "Output {} holds {} file(s)",
            root.display(),
            previous.len()
        );

        Ok(Self {
            root,
            previous,
            declared: OutputFileSet::new(),
            current: BTreeSet::new(),
            failures: Vec::new(),
            report: SyncReport::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files that existed when the pass began.
    pub fn previous(&self) -> impl Iterator<Item = &Path> {
        self.previous.iter().map(PathBuf::as_path)
    }

    /// Delete all previous output now instead of at finalize.
    pub fn purge(&mut self) -> Result<usize, OutputError> {
        let previous = std::mem::take(&mut self.previous);
        let mut removed = 0;

        for relative in previous {
            match self.remove(&relative)? {
                true => removed += 1,
                false => {
                    self.previous.insert(relative);
                }
            }
        }

        self.prune_empty_dirs();
        self.report.removed += removed;
        Ok(removed)
    }

    /// Install the set of files this build may produce.
    pub fn declare(&mut self, files: OutputFileSet) {
        self.declared = files;
    }

    /// Write `bytes` to `relative` under the output root.
    ///
    /// The file is replaced atomically. A file that already holds exactly
    /// these bytes is not touched. I/O failures are recorded for the final
    /// report and also returned.
    pub fn write(
        &mut self,
        relative: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<WriteStatus, OutputError> {
        let relative = relative.as_ref();
        if !self.declared.contains(relative) {
            return Err(OutputError::Undeclared(relative.to_path_buf()));
        }

        let path = self.root.join(relative);
        let bytes = bytes.as_ref();

        if fs::read(&path).is_ok_and(|existing| existing == bytes) {
            self.current.insert(relative.to_path_buf());
            self.report.unchanged += 1;
            return Ok(WriteStatus::Unchanged);
        }

        match write_atomic(&path, bytes) {
            Ok(()) => {
                self.current.insert(relative.to_path_buf());
                self.report.written += 1;
                Ok(WriteStatus::Written)
            }
            Err(e) => Err(self.fail(relative, SyncOp::Write, e)),
        }
    }

    /// Mirror a source file unchanged to `relative` under the output root.
    pub fn copy(
        &mut self,
        source: &Path,
        relative: impl AsRef<Path>,
    ) -> Result<WriteStatus, OutputError> {
        let relative = relative.as_ref();
        match fs::read(source) {
            Ok(bytes) => self.write(relative, bytes),
            Err(e) => Err(self.fail(relative, SyncOp::Copy, e)),
        }
    }

    /// Delete stale files and report the outcome of the whole pass.
    pub fn finalize(mut self) -> Result<SyncReport, OutputSyncError> {
        let stale: Vec<PathBuf> = self
            .previous
            .difference(&self.current)
            .cloned()
            .collect();

        for relative in stale {
            match self.remove(&relative) {
                Ok(true) => self.report.removed += 1,
                Ok(false) => {}
                // Fatal errors are already recorded as failures.
                Err(_) => break,
            }
        }

        self.prune_empty_dirs();

        if self.failures.is_empty() {
            Ok(self.report)
        } else {
            Err(OutputSyncError {
                failures: self.failures,
                report: self.report,
            })
        }
    }

    /// Remove one output file. `Ok(false)` means the delete failed and was recorded.
    fn remove(&mut self, relative: &Path) -> Result<bool, OutputError> {
        let path = self.root.join(relative);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed stale {}", relative.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => {
                let err = self.fail(relative, SyncOp::Delete, e);
                if err.is_fatal() {
                    Err(err)
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn fail(&mut self, relative: &Path, op: SyncOp, e: io::Error) -> OutputError {
        self.failures.push(SyncFailure {
            path: relative.to_path_buf(),
            op,
            message: e.to_string(),
        });

        let path = self.root.join(relative);
        if is_exhaustion(&e) {
            OutputError::Fatal { path, source: e }
        } else {
            OutputError::Io { path, source: e }
        }
    }

    fn prune_empty_dirs(&self) {
        let dirs = WalkDir::new(&self.root)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir());

        for dir in dirs {
            // Fails harmlessly when the directory still has entries.
            if fs::remove_dir(dir.path()).is_ok() {
                tracing::debug!("Pruned empty directory {}", dir.path().display());
            }
        }
    }
}

/// Errors after which no further output can be produced.
fn is_exhaustion(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::StorageFull | io::ErrorKind::ReadOnlyFilesystem
    )
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.flush()?;
    set_readable(file.as_file())?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(unix)]
fn set_readable(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_readable(_file: &fs::File) -> io::Result<()> {
    Ok(())
}
