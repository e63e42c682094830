/*!
 * Subtitle reconciliation engine.
 *
 * Pipeline per movie:
 * - `exclusion`: skip movies sitting directly in a library root
 * - `discovery`: find subtitle files one folder below the movie
 * - `naming`: compute the sibling filename next to the movie
 * - `materialize`: link, or copy when linking is not possible
 * - `orchestrator`: drive the above over all movies, track changes and progress
 */

pub mod discovery;
pub mod exclusion;
pub mod materialize;
pub mod naming;
pub mod orchestrator;

pub use discovery::{Discovery, SubtitleDiscoverer};
pub use exclusion::RootExclusionFilter;
pub use materialize::{should_fall_back_to_copy, DryRunFs, Materializer, StdFs, SubtitleFs};
pub use naming::{DestinationNamer, NamingMode};
pub use orchestrator::{progress_percent, NoProgress, ProgressSink, Reconciler};
