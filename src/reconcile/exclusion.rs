use std::path::Path;

use crate::errors::ReconcileError;
use crate::model::{LibraryRoot, MovieEntry};

/// Skips movies that sit directly in a library root.
///
/// Such movies have no private folder, so their "subfolders" are other movies'
/// folders and reconciling them would pull unrelated subtitles into the root.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootExclusionFilter;

impl RootExclusionFilter {
    /// Directory that holds the movie file
    pub fn movie_dir(movie_path: &Path) -> Result<&Path, ReconcileError> {
        match movie_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Ok(parent),
            _ => Err(ReconcileError::Path {
                path: movie_path.to_path_buf(),
            }),
        }
    }

    /// True when the movie's parent directory is one of the root locations.
    ///
    /// Comparison is on the raw OS string: `/movies/` and `/movies` are
    /// different roots here, as are paths that differ only in case or reach
    /// the same directory through a symlink.
    pub fn is_excluded(movie: &MovieEntry, roots: &[LibraryRoot]) -> Result<bool, ReconcileError> {
        Ok(Self::is_root_location(Self::movie_dir(&movie.path)?, roots))
    }

    /// True when `dir` is, verbatim, one of the root locations
    pub fn is_root_location(dir: &Path, roots: &[LibraryRoot]) -> bool {
        roots
            .iter()
            .flat_map(|root| root.locations.iter())
            .any(|location| location.as_os_str() == dir.as_os_str())
    }
}
