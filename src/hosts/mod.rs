/*!
 * Media hosts the reconciliation engine can be driven from.
 *
 * A host knows which movies and library roots exist and can be asked to
 * re-index. The engine never talks to a host; the controller does.
 * - `local`: plain directories on disk, nothing to notify
 * - `jellyfin`: a Jellyfin server over its HTTP API
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::HostError;
use crate::model::{LibraryRoot, MovieEntry};

/// Collaborators the controller needs from the media host
#[async_trait]
pub trait MediaHost: Send + Sync + Debug {
    /// Short host label for logs
    fn name(&self) -> &str;

    /// All non-virtual movies, in a stable order
    async fn list_movies(&self) -> Result<Vec<MovieEntry>, HostError>;

    /// Root locations of every configured library
    async fn list_library_roots(&self) -> Result<Vec<LibraryRoot>, HostError>;

    /// Whether a library scan is running right now
    async fn is_scan_in_progress(&self) -> Result<bool, HostError>;

    /// Ask the host to re-read one movie's metadata
    async fn request_item_refresh(&self, movie: &MovieEntry) -> Result<(), HostError>;

    /// Ask the host to rescan every library
    async fn request_full_rescan(&self) -> Result<(), HostError>;
}

pub mod jellyfin;
pub mod local;

pub use jellyfin::JellyfinHost;
pub use local::LocalHost;
