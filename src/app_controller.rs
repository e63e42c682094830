use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::app_config::{Config, HostConfig};
use crate::hosts::{JellyfinHost, LocalHost, MediaHost};
use crate::model::{LibraryRoot, MovieEntry, ReconciliationResult};
use crate::reconcile::{DryRunFs, ProgressSink, Reconciler, StdFs, SubtitleFs};

// @module: Application controller for subtitle reconciliation

/// Outcome of one controller run
#[derive(Debug, Default)]
pub struct RunReport {
    /// What the engine did
    pub result: ReconciliationResult,
    /// Movies the host accepted a refresh request for
    pub refreshed_items: usize,
    /// Whether a full library rescan was requested
    pub rescan_requested: bool,
    /// Destinations a real run would create; only filled in dry-run mode
    pub planned: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Main application controller: fetches movies from the host, runs the
/// engine off the async runtime and notifies the host afterwards
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Where movies come from and who gets notified
    host: Arc<dyn MediaHost>,
    // @field: Plan only, touch nothing
    dry_run: bool,
}

impl Controller {
    // @method: Create a new controller, building the host the config names
    pub fn with_config(config: Config) -> Result<Self> {
        let host = Self::build_host(&config.host)?;
        Ok(Self::with_host(config, host))
    }

    /// Create a controller over an already built host
    pub fn with_host(config: Config, host: Arc<dyn MediaHost>) -> Self {
        Self {
            config,
            host,
            dry_run: false,
        }
    }

    /// Only plan the links, leave the filesystem and the host alone
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &Arc<dyn MediaHost> {
        &self.host
    }

    fn build_host(host: &HostConfig) -> Result<Arc<dyn MediaHost>> {
        match host {
            HostConfig::Local { libraries } => Ok(Arc::new(LocalHost::new(libraries.clone()))),
            HostConfig::Jellyfin {
                url,
                api_key,
                timeout_secs,
            } => {
                let client = JellyfinHost::new(url, api_key.clone(), *timeout_secs)
                    .context("Failed to create Jellyfin client")?;
                Ok(Arc::new(client))
            }
        }
    }

    /// Run with a terminal progress bar
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport> {
        let progress_bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Reconciling subtitles");

        let bar = progress_bar.clone();
        let sink: Arc<dyn ProgressSink> = Arc::new(move |percent: f64| {
            bar.set_position(percent.round() as u64);
        });

        let report = self.run_with_progress(sink, cancel).await;
        progress_bar.finish_and_clear();
        report
    }

    /// Run the whole workflow, reporting engine progress to `progress`.
    ///
    /// Host listing errors abort the run. Refresh and rescan errors are logged
    /// and do not fail it, since the links on disk are already in place.
    pub async fn run_with_progress(
        &self,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let start_time = Instant::now();
        info!(
            "Running subtitle reconciliation against {} host{}",
            self.host.name(),
            if self.dry_run { " (dry run)" } else { "" }
        );

        let movies = self
            .host
            .list_movies()
            .await
            .context("Failed to list movies from host")?;
        let roots = self
            .host
            .list_library_roots()
            .await
            .context("Failed to list library roots from host")?;
        info!(
            "Found {} movies across {} libraries",
            movies.len(),
            roots.len()
        );

        let dry_run_fs = self.dry_run.then(|| Arc::new(DryRunFs::new()));
        let fs: Arc<dyn SubtitleFs> = match &dry_run_fs {
            Some(plan) => plan.clone() as Arc<dyn SubtitleFs>,
            None => Arc::new(StdFs),
        };
        let reconciler = Reconciler::with_fs(self.config.naming, fs);

        let result = Self::reconcile_blocking(reconciler, movies, roots, progress, cancel).await?;

        let mut report = RunReport {
            planned: dry_run_fs.map(|plan| plan.planned()).unwrap_or_default(),
            ..RunReport::default()
        };

        if !self.dry_run {
            if self.config.refresh_changed_items {
                report.refreshed_items = self.refresh_changed(&result.changed_movies).await;
            }
            if result.cancelled {
                info!("Run was cancelled, not requesting a library rescan");
            } else {
                report.rescan_requested = self.maybe_rescan(result.has_changes()).await;
            }
        }

        report.result = result;
        report.elapsed = start_time.elapsed();
        self.log_summary(&report);
        Ok(report)
    }

    async fn reconcile_blocking(
        reconciler: Reconciler,
        movies: Vec<MovieEntry>,
        roots: Vec<LibraryRoot>,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<ReconciliationResult> {
        tokio::task::spawn_blocking(move || {
            reconciler.run(&movies, &roots, progress.as_ref(), &cancel)
        })
        .await
        .map_err(|e| anyhow!("Reconciliation task failed: {}", e))
    }

    async fn refresh_changed(&self, changed: &[MovieEntry]) -> usize {
        let mut refreshed = 0;
        for movie in changed {
            match self.host.request_item_refresh(movie).await {
                Ok(()) => {
                    debug!("Requested refresh of {}", movie.display_name());
                    refreshed += 1;
                }
                Err(e) => warn!("Failed to refresh {}: {}", movie.display_name(), e),
            }
        }
        refreshed
    }

    // @returns: Whether the host accepted a rescan request
    async fn maybe_rescan(&self, changed: bool) -> bool {
        if !self.config.rescan.wants_rescan(changed) {
            debug!("Rescan policy '{}' skips the rescan", self.config.rescan);
            return false;
        }

        match self.host.is_scan_in_progress().await {
            Ok(true) => {
                info!("A library scan is already running, not requesting another");
                false
            }
            Ok(false) => match self.host.request_full_rescan().await {
                Ok(()) => {
                    info!("Requested a full library rescan");
                    true
                }
                Err(e) => {
                    error!("Failed to request library rescan: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Could not check for a running library scan: {}", e);
                false
            }
        }
    }

    fn log_summary(&self, report: &RunReport) {
        let result = &report.result;
        info!(
            "Checked {} movies ({} skipped), {} gained subtitles: {} linked, {} copied, {} already present",
            result.movies_considered,
            result.movies_skipped,
            result.movies_changed,
            result.linked,
            result.copied,
            result.skipped_existing
        );

        if result.name_collisions > 0 {
            warn!(
                "{} subtitles collided with the destination name of another subtitle of the same movie",
                result.name_collisions
            );
        }

        if self.dry_run && !report.planned.is_empty() {
            info!("Dry run, {} subtitle files would be created:", report.planned.len());
            for path in &report.planned {
                info!("  {}", path.display());
            }
        }

        if !result.failures.is_empty() {
            warn!("{} subtitle operations failed:", result.failures.len());
            for failure in &result.failures {
                warn!("  [{}] {}", failure.error.kind_label(), failure.error);
            }
        }

        info!("Finished in {}", Self::format_duration(report.elapsed));
    }

    // @formats: Duration as a human readable string
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
