use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::model::{LibraryRoot, MaterializeOutcome, MovieEntry, ReconciliationResult, SubtitleCandidate};

use super::discovery::SubtitleDiscoverer;
use super::exclusion::RootExclusionFilter;
use super::materialize::{Materializer, SubtitleFs};
use super::naming::{DestinationNamer, NamingMode};

/// Receives the percentage of movies completed, 0 to 100
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// Sink that drops every report
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: f64) {}
}

/// Percentage of `completed` out of `total`, in floating point so it climbs
/// smoothly instead of sitting at 0 until the last movie.
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 || completed >= total {
        return 100.0;
    }
    completed as f64 * 100.0 / total as f64
}

// Terminal state of one movie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovieState {
    Skipped,
    Processed { changed: bool },
}

/// Runs exclusion, discovery, naming and materialization over a list of movies
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    namer: DestinationNamer,
    materializer: Materializer,
}

impl Reconciler {
    pub fn new(namer: DestinationNamer, materializer: Materializer) -> Self {
        Self { namer, materializer }
    }

    /// Reconciler writing through `fs` with the given naming mode
    pub fn with_fs(naming: NamingMode, fs: Arc<dyn SubtitleFs>) -> Self {
        Self::new(DestinationNamer::new(naming), Materializer::new(fs))
    }

    /// Reconcile `movies` in order.
    ///
    /// Cancellation is honoured between movies, never inside one. Progress is
    /// reported after every movie, skipped ones included; nothing is reported
    /// for an empty list.
    pub fn run(
        &self,
        movies: &[MovieEntry],
        roots: &[LibraryRoot],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ReconciliationResult {
        let total = movies.len();
        let mut result = ReconciliationResult::default();

        for (index, movie) in movies.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Reconciliation cancelled after {} of {} movies", index, total);
                result.cancelled = true;
                break;
            }

            result.movies_considered += 1;
            match self.reconcile_movie(movie, roots, &mut result) {
                MovieState::Skipped => result.movies_skipped += 1,
                MovieState::Processed { changed: true } => {
                    result.movies_changed += 1;
                    result.changed_movies.push(movie.clone());
                }
                MovieState::Processed { changed: false } => {}
            }

            progress.report(progress_percent(index + 1, total));
        }

        result
    }

    fn reconcile_movie(
        &self,
        movie: &MovieEntry,
        roots: &[LibraryRoot],
        result: &mut ReconciliationResult,
    ) -> MovieState {
        debug!("Checking movie: {}", movie.display_name());

        if !movie.is_usable() {
            debug!("Skipping unusable entry: {:?}", movie);
            return MovieState::Skipped;
        }

        let movie_dir = match RootExclusionFilter::movie_dir(&movie.path) {
            Ok(dir) => dir,
            Err(err) => {
                warn!("{}", err);
                result.record_failure(err);
                return MovieState::Skipped;
            }
        };

        if RootExclusionFilter::is_root_location(movie_dir, roots) {
            debug!("Movie sits directly in a library root, skipping: {:?}", movie.path);
            return MovieState::Skipped;
        }

        let mut changed = false;
        let mut claimed = HashMap::new();
        for item in SubtitleDiscoverer::discover(movie_dir) {
            let candidate = match item {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!("{}", err);
                    result.record_failure(err);
                    continue;
                }
            };
            debug!("Found eligible subtitle file: {:?}", candidate.path);

            let destination = self.claim_destination(&movie.path, &candidate, &mut claimed, result);
            match self.materializer.materialize(&candidate.path, &destination) {
                MaterializeOutcome::Skipped => result.skipped_existing += 1,
                MaterializeOutcome::Linked => {
                    result.linked += 1;
                    changed = true;
                }
                MaterializeOutcome::Copied => {
                    result.copied += 1;
                    changed = true;
                }
                MaterializeOutcome::Failed(err) => {
                    error!("{}", err);
                    result.record_failure(err);
                }
            }
        }

        if changed {
            info!("New subtitles for {}", movie.display_name());
        }
        MovieState::Processed { changed }
    }

    // Two subtitles of one movie may map to the same name (`Subs/2_English.srt`
    // and `Subs/3_French.srt` both become `Movie.srt`). The first one keeps it,
    // later ones get the collision name instead of being dropped as "existing".
    fn claim_destination(
        &self,
        movie_path: &Path,
        candidate: &SubtitleCandidate,
        claimed: &mut HashMap<PathBuf, PathBuf>,
        result: &mut ReconciliationResult,
    ) -> PathBuf {
        let destination = self.namer.compute_destination(movie_path, &candidate.path);

        let Some(first) = claimed.get(&destination).cloned() else {
            claimed.insert(destination.clone(), candidate.path.clone());
            return destination;
        };
        if first == candidate.path {
            return destination;
        }

        result.name_collisions += 1;
        match self.namer.collision_destination(movie_path, &candidate.path) {
            Some(renamed) => {
                warn!(
                    "{:?} and {:?} both map to {:?}, using {:?} for the second",
                    first, candidate.path, destination, renamed
                );
                renamed
            }
            None => {
                warn!("{:?} and {:?} both map to {:?}", first, candidate.path, destination);
                destination
            }
        }
    }
}
