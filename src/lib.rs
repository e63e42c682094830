/*!
 * # subfixer - Movie subtitle sorter
 *
 * A Rust library that makes subtitle files shipped in a movie's subfolder
 * visible to media servers, by linking or copying them next to the movie
 * under the movie's own name.
 *
 * ## Features
 *
 * - Find subtitle files exactly one folder below each movie
 * - Name them after the movie, keeping language and flag tags
 * - Symlink them in place, copying when links are not possible
 * - Never overwrite anything that already exists
 * - Skip movies that sit directly in a library root
 * - Drive a Jellyfin server or plain local directories
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `model`: Movies, library roots and run results
 * - `reconcile`: The reconciliation engine:
 *   - `reconcile::exclusion`: Library root exclusion
 *   - `reconcile::discovery`: Subtitle discovery
 *   - `reconcile::naming`: Destination naming
 *   - `reconcile::materialize`: Link-or-copy
 *   - `reconcile::orchestrator`: Per-movie driver with progress and cancellation
 * - `hosts`: Media hosts the engine is fed from:
 *   - `hosts::local`: Plain library directories
 *   - `hosts::jellyfin`: Jellyfin HTTP API client
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod hosts;
pub mod model;
pub mod reconcile;

// Re-export main types for easier usage
pub use app_config::{Config, HostConfig, RescanPolicy};
pub use app_controller::{Controller, RunReport};
pub use errors::{HostError, ReconcileError};
pub use hosts::{JellyfinHost, LocalHost, MediaHost};
pub use model::{LibraryRoot, MovieEntry, ReconciliationResult};
pub use reconcile::{NamingMode, Reconciler};
