use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::HostError;
use crate::file_utils::FileManager;
use crate::model::{LibraryRoot, MovieEntry};

use super::MediaHost;

/// Host backed by plain library directories.
///
/// Every video file below a location is a movie. There is no server to
/// notify, so refresh and rescan requests are only logged.
#[derive(Debug, Clone)]
pub struct LocalHost {
    libraries: Vec<LibraryRoot>,
}

impl LocalHost {
    /// Build a host over the given libraries.
    ///
    /// Locations are made absolute (links must not point at relative paths)
    /// and normalized component-wise, dropping any trailing separator, so they
    /// compare equal to the parent of a file found directly below them.
    pub fn new(libraries: Vec<LibraryRoot>) -> Self {
        let libraries = libraries
            .into_iter()
            .map(|library| LibraryRoot {
                name: library.name,
                locations: library
                    .locations
                    .iter()
                    .map(|location| normalize_location(location))
                    .collect(),
            })
            .collect();
        Self { libraries }
    }

    pub fn libraries(&self) -> &[LibraryRoot] {
        &self.libraries
    }

    fn collect_movies(libraries: &[LibraryRoot]) -> Result<Vec<MovieEntry>, HostError> {
        // BTreeSet sorts and drops files reachable from overlapping locations
        let mut paths = BTreeSet::new();
        for location in libraries.iter().flat_map(|library| library.locations.iter()) {
            let found = FileManager::find_video_files(location)
                .map_err(|e| HostError::Io(io::Error::other(format!("{:#}", e))))?;
            debug!("Found {} video files under {:?}", found.len(), location);
            paths.extend(found);
        }

        Ok(paths.into_iter().map(MovieEntry::new).collect())
    }
}

fn normalize_location(location: &Path) -> PathBuf {
    let absolute = std::path::absolute(location).unwrap_or_else(|_| location.to_path_buf());
    absolute.components().collect()
}

#[async_trait]
impl MediaHost for LocalHost {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_movies(&self) -> Result<Vec<MovieEntry>, HostError> {
        let libraries = self.libraries.clone();
        tokio::task::spawn_blocking(move || Self::collect_movies(&libraries))
            .await
            .map_err(|e| HostError::RequestFailed(format!("Library walk task failed: {}", e)))?
    }

    async fn list_library_roots(&self) -> Result<Vec<LibraryRoot>, HostError> {
        Ok(self.libraries.clone())
    }

    async fn is_scan_in_progress(&self) -> Result<bool, HostError> {
        Ok(false)
    }

    async fn request_item_refresh(&self, movie: &MovieEntry) -> Result<(), HostError> {
        debug!("No media server to refresh {}", movie.display_name());
        Ok(())
    }

    async fn request_full_rescan(&self) -> Result<(), HostError> {
        if self.libraries.is_empty() {
            warn!("No local libraries configured");
        }
        info!("Local libraries updated; rescan them in your media server to pick up new subtitles");
        Ok(())
    }
}
