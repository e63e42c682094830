use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::errors::ReconcileError;
use crate::model::SubtitleCandidate;

/// Finds subtitle files one folder below a movie
#[derive(Debug, Default, Clone, Copy)]
pub struct SubtitleDiscoverer;

impl SubtitleDiscoverer {
    /// Lazily list candidates in the immediate subdirectories of `movie_dir`.
    ///
    /// Neither level recurses further. Items come out in directory-listing
    /// order; sort them if you need determinism.
    pub fn discover(movie_dir: &Path) -> Discovery {
        Discovery {
            subdirs: one_level(movie_dir),
            files: None,
        }
    }
}

/// Single-pass iterator returned by [`SubtitleDiscoverer::discover`].
///
/// A listing error surfaces as one `Err` item; iteration then carries on with
/// whatever is left.
pub struct Discovery {
    subdirs: walkdir::IntoIter,
    files: Option<walkdir::IntoIter>,
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("in_subdirectory", &self.files.is_some())
            .finish()
    }
}

impl Iterator for Discovery {
    type Item = Result<SubtitleCandidate, ReconcileError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(files) = self.files.as_mut() {
                match files.next() {
                    Some(Ok(entry)) => {
                        if is_file_like(&entry) {
                            if let Some(candidate) = SubtitleCandidate::from_path(entry.path()) {
                                return Some(Ok(candidate));
                            }
                        }
                        continue;
                    }
                    Some(Err(err)) => return Some(Err(directory_error(err))),
                    None => {
                        self.files = None;
                    }
                }
            }

            match self.subdirs.next()? {
                Ok(entry) => {
                    if is_dir_like(&entry) {
                        self.files = Some(one_level(entry.path()));
                    }
                }
                Err(err) => return Some(Err(directory_error(err))),
            }
        }
    }
}

fn one_level(dir: &Path) -> walkdir::IntoIter {
    WalkDir::new(dir).min_depth(1).max_depth(1).into_iter()
}

// Symlinked entries count by what they point at; dangling links count as neither.
fn is_dir_like(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir())
}

fn is_file_like(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

fn directory_error(err: walkdir::Error) -> ReconcileError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    ReconcileError::Directory { path, source }
}
