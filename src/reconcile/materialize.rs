use log::{debug, warn};
use std::collections::HashSet;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::ReconcileError;
use crate::file_utils::FileManager;
use crate::model::MaterializeOutcome;

/// Filesystem operations the materializer needs.
///
/// Swapping the implementation lets tests simulate link failures and lets the
/// CLI plan a run without writing anything.
pub trait SubtitleFs: Send + Sync + Debug {
    /// Whether anything (file, directory, symlink, dangling or not) occupies `path`
    fn exists(&self, path: &Path) -> bool;

    /// Create a symbolic link at `link` pointing to `target`
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Copy `from` to `to`, never overwriting `to`
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
}

/// The real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFs;

impl SubtitleFs for StdFs {
    fn exists(&self, path: &Path) -> bool {
        FileManager::entry_exists(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        FileManager::create_symlink(target, link)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        FileManager::copy_file_no_clobber(from, to)
    }
}

/// Reads the real filesystem but only pretends to write.
///
/// Planned links are remembered so a second candidate mapping to the same
/// destination is reported as skipped, just like a real run.
#[derive(Debug, Default)]
pub struct DryRunFs {
    planned: Mutex<HashSet<PathBuf>>,
}

impl DryRunFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destinations that a real run would have created
    pub fn planned(&self) -> Vec<PathBuf> {
        let mut planned: Vec<PathBuf> = self
            .planned
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        planned.sort();
        planned
    }
}

impl SubtitleFs for DryRunFs {
    fn exists(&self, path: &Path) -> bool {
        FileManager::entry_exists(path)
            || self
                .planned
                .lock()
                .map(|set| set.contains(path))
                .unwrap_or(false)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        debug!("[dry-run] would link {:?} -> {:?}", link, target);
        let mut planned = self
            .planned
            .lock()
            .map_err(|_| io::Error::other("dry-run plan lock poisoned"))?;
        if !planned.insert(link.to_path_buf()) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        debug!("[dry-run] would copy {:?} to {:?}", from, to);
        Ok(0)
    }
}

/// Link-or-copy, never overwriting
#[derive(Debug, Clone)]
pub struct Materializer {
    fs: Arc<dyn SubtitleFs>,
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new(Arc::new(StdFs))
    }
}

impl Materializer {
    pub fn new(fs: Arc<dyn SubtitleFs>) -> Self {
        Self { fs }
    }

    /// Make `destination` available as a link to (or copy of) `subtitle`.
    ///
    /// An existing destination is left alone whatever its content. A link
    /// failure of an I/O nature falls back to a copy; any other link failure
    /// is reported as is.
    pub fn materialize(&self, subtitle: &Path, destination: &Path) -> MaterializeOutcome {
        if self.fs.exists(destination) {
            debug!("Destination already present: {:?}", destination);
            return MaterializeOutcome::Skipped;
        }

        let link_error = match self.fs.symlink(subtitle, destination) {
            Ok(()) => {
                debug!("Linked {:?} -> {:?}", destination, subtitle);
                return MaterializeOutcome::Linked;
            }
            Err(err) => err,
        };

        if !should_fall_back_to_copy(&link_error) {
            return MaterializeOutcome::Failed(ReconcileError::Link {
                subtitle: subtitle.to_path_buf(),
                destination: destination.to_path_buf(),
                source: link_error,
            });
        }

        warn!("Could not link {:?} ({}), copying instead", destination, link_error);
        match self.fs.copy(subtitle, destination) {
            Ok(bytes) => {
                debug!("Copied {} bytes from {:?} to {:?}", bytes, subtitle, destination);
                MaterializeOutcome::Copied
            }
            Err(copy_error) => MaterializeOutcome::Failed(ReconcileError::Copy {
                subtitle: subtitle.to_path_buf(),
                destination: destination.to_path_buf(),
                link_error,
                source: copy_error,
            }),
        }
    }
}

/// Link errors that a copy can work around.
///
/// A destination that appeared meanwhile, a missing source, an access refusal
/// or a malformed path would fail the copy too (or must not be overwritten), so
/// those are final. `EPERM` is not an access refusal: it is what filesystems
/// without symlink support answer.
pub fn should_fall_back_to_copy(error: &io::Error) -> bool {
    match error.kind() {
        io::ErrorKind::AlreadyExists | io::ErrorKind::NotFound | io::ErrorKind::InvalidInput => false,
        io::ErrorKind::PermissionDenied => is_operation_not_permitted(error),
        _ => true,
    }
}

#[cfg(unix)]
fn is_operation_not_permitted(error: &io::Error) -> bool {
    const EPERM: i32 = 1;
    error.raw_os_error() == Some(EPERM)
}

#[cfg(not(unix))]
fn is_operation_not_permitted(_error: &io::Error) -> bool {
    false
}
