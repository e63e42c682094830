/*!
 * Data model shared by the reconciliation engine and the host adapters.
 *
 * Everything here is transient: built at the start of a run, dropped at the end.
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ReconcileError;

/// Subtitle extensions picked up during discovery, lowercase and without the dot
pub const SUBTITLE_EXTENSIONS: [&str; 6] = ["ass", "srt", "ssa", "sub", "idx", "vtt"];

/// Check an extension (with or without leading dot) against the subtitle set, ignoring case
pub fn is_subtitle_extension(extension: &str) -> bool {
    let extension = extension.strip_prefix('.').unwrap_or(extension);
    SUBTITLE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(extension))
}

/// A movie as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieEntry {
    /// Host item identifier, if the host has one
    #[serde(default)]
    pub id: Option<String>,

    /// Display name, used for logging only
    #[serde(default)]
    pub name: String,

    /// Absolute path of the primary video file
    pub path: PathBuf,

    /// Whether the host considers the entry usable
    #[serde(default = "default_true")]
    pub is_valid: bool,
}

fn default_true() -> bool {
    true
}

impl MovieEntry {
    /// Create a valid entry for a path, naming it after the file stem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id: None,
            name,
            path,
            is_valid: true,
        }
    }

    /// Attach a host identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// An entry is usable when it is valid and carries a non-empty path
    pub fn is_usable(&self) -> bool {
        self.is_valid && !self.path.as_os_str().is_empty()
    }

    /// Name for log lines, falling back to the path
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.path.display().to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Top-level folders of one configured library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRoot {
    /// Library name
    #[serde(default)]
    pub name: String,

    /// Root directories, compared verbatim against movie parents
    pub locations: Vec<PathBuf>,
}

impl LibraryRoot {
    pub fn new(name: impl Into<String>, locations: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            locations,
        }
    }
}

/// A subtitle-like file found in one of a movie's subfolders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCandidate {
    /// Absolute path of the subtitle file
    pub path: PathBuf,

    /// Lowercase extension without the dot
    pub extension: String,
}

impl SubtitleCandidate {
    /// Build a candidate if the path carries a recognized subtitle extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        if !is_subtitle_extension(&extension) {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            extension,
        })
    }
}

/// Result of materializing one candidate
#[derive(Debug)]
pub enum MaterializeOutcome {
    /// Destination already existed
    Skipped,
    /// Symbolic link created
    Linked,
    /// Byte copy created after the link attempt failed
    Copied,
    /// Nothing created
    Failed(ReconcileError),
}

impl MaterializeOutcome {
    /// True when the outcome put a new file next to the movie
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Linked | Self::Copied)
    }
}

/// A recorded per-item failure
#[derive(Debug)]
pub struct Failure {
    /// Movie or subtitle path the failure relates to
    pub source_path: PathBuf,
    /// What went wrong
    pub error: ReconcileError,
}

/// Aggregated outcome of one reconciliation run
#[derive(Debug, Default)]
pub struct ReconciliationResult {
    /// Movies handed to the run (processed or skipped)
    pub movies_considered: usize,
    /// Movies skipped as unusable or root-excluded
    pub movies_skipped: usize,
    /// Movies that received at least one new subtitle
    pub movies_changed: usize,
    /// Entries of the changed movies, in processing order
    pub changed_movies: Vec<MovieEntry>,
    /// Destinations created as symbolic links
    pub linked: usize,
    /// Destinations created as copies
    pub copied: usize,
    /// Candidates whose destination already existed
    pub skipped_existing: usize,
    /// Candidates renamed because an earlier candidate of the same movie
    /// already claimed their destination
    pub name_collisions: usize,
    /// Per-item failures, in the order they happened
    pub failures: Vec<Failure>,
    /// Run stopped early on cancellation
    pub cancelled: bool,
}

impl ReconciliationResult {
    /// True when at least one subtitle was linked or copied
    pub fn has_changes(&self) -> bool {
        self.movies_changed > 0
    }

    pub(crate) fn record_failure(&mut self, error: ReconcileError) {
        self.failures.push(Failure {
            source_path: error.path().to_path_buf(),
            error,
        });
    }
}
