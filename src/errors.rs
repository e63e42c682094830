/*!
 * Error types for the subfixer application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reconciling a single movie or subtitle.
///
/// None of these are fatal to a run: they are collected into
/// [`ReconciliationResult::failures`](crate::model::ReconciliationResult) and the
/// run moves on to the next candidate or movie.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The movie path has no usable parent directory
    #[error("Movie path has no parent directory: {path:?}")]
    Path {
        /// Offending movie path
        path: PathBuf,
    },

    /// A directory could not be listed
    #[error("Failed to read directory {path:?}: {source}")]
    Directory {
        /// Directory that failed to list
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Symbolic link creation failed and no copy was attempted
    #[error("Failed to link {destination:?} -> {subtitle:?}: {source}")]
    Link {
        /// Subtitle the link would point to
        subtitle: PathBuf,
        /// Sibling path next to the movie
        destination: PathBuf,
        /// Error returned by the link attempt
        #[source]
        source: io::Error,
    },

    /// Symbolic link creation failed and the copy fallback failed as well
    #[error("Failed to copy {subtitle:?} to {destination:?}: {source} (link attempt: {link_error})")]
    Copy {
        /// Subtitle being copied
        subtitle: PathBuf,
        /// Sibling path next to the movie
        destination: PathBuf,
        /// Error from the link attempt that triggered the fallback
        link_error: io::Error,
        /// Error returned by the copy
        #[source]
        source: io::Error,
    },
}

impl ReconcileError {
    /// Path the failure is about: the movie, the directory or the subtitle
    pub fn path(&self) -> &Path {
        match self {
            Self::Path { path } | Self::Directory { path, .. } => path,
            Self::Link { subtitle, .. } | Self::Copy { subtitle, .. } => subtitle,
        }
    }

    /// Short label for the error kind, used in run summaries
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Path { .. } => "path",
            Self::Directory { .. } => "directory",
            Self::Link { .. } => "link",
            Self::Copy { .. } => "copy",
        }
    }
}

/// Errors that can occur when talking to a media host
#[derive(Error, Debug)]
pub enum HostError {
    /// Error when making a request fails
    #[error("Host request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing a host response fails
    #[error("Failed to parse host response: {0}")]
    ParseError(String),

    /// Error returned by the host API itself
    #[error("Host responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the host
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Local filesystem error while enumerating a library
    #[error("Library I/O error: {0}")]
    Io(#[from] io::Error),
}
