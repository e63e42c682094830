// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use subfixer::app_config::{self, Config, RescanPolicy};
use subfixer::{Controller, NamingMode};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for NamingMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliNamingMode {
    /// Movie.mkv + sub/track.en.srt -> Movie.en.srt
    ReplaceBaseName,
    /// Movie.mkv + sub/track.en.srt -> Movie.track.en.srt
    AppendFileName,
}

impl From<CliNamingMode> for NamingMode {
    fn from(cli_mode: CliNamingMode) -> Self {
        match cli_mode {
            CliNamingMode::ReplaceBaseName => NamingMode::ReplaceBaseName,
            CliNamingMode::AppendFileName => NamingMode::AppendFileName,
        }
    }
}

/// CLI Wrapper for RescanPolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliRescanPolicy {
    Always,
    WhenChanged,
    Never,
}

impl From<CliRescanPolicy> for RescanPolicy {
    fn from(cli_policy: CliRescanPolicy) -> Self {
        match cli_policy {
            CliRescanPolicy::Always => RescanPolicy::Always,
            CliRescanPolicy::WhenChanged => RescanPolicy::WhenChanged,
            CliRescanPolicy::Never => RescanPolicy::Never,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Link subtitles next to their movies (default command)
    #[command(alias = "fix")]
    Run(RunArgs),

    /// Generate shell completions for subfixer
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Library directories to process instead of the configured host
    #[arg(value_name = "LIBRARY_DIR")]
    library_dirs: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Show what would be linked without touching anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// How subtitle files are renamed next to the movie
    #[arg(long, value_enum)]
    naming: Option<CliNamingMode>,

    /// When to ask the media server for a library rescan
    #[arg(long, value_enum)]
    rescan: Option<CliRescanPolicy>,

    /// Do not ask the media server to refresh changed movies
    #[arg(long)]
    no_refresh: bool,
}

/// subfixer - Movie subtitle sorter
///
/// Makes subtitles stored in a movie's subfolder visible to media servers by
/// linking them next to the movie under the movie's name.
#[derive(Parser, Debug)]
#[command(name = "subfixer")]
#[command(version)]
#[command(about = "Link subtitles from movie subfolders next to their movies")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "subfixer finds subtitle files one folder below each movie and links them
next to the movie, named after it, so media servers pick them up. Existing
files are never overwritten; when a link cannot be created the subtitle is
copied instead.

EXAMPLES:
    subfixer /media/movies                      # Process a local library
    subfixer -n /media/movies                   # Dry run, only list planned links
    subfixer --naming append-file-name /movies  # Keep the subtitle's own name
    subfixer -c jellyfin.json                   # Use the host from a config file
    subfixer --log-level debug /media/movies    # Show per-movie decisions
    subfixer completions bash > subfixer.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default
    one will be created automatically. Library directories given on the command
    line replace the configured host with local libraries.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Accept everything here; the effective level is lowered once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subfixer", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Run(args)) => run_reconcile(args).await,
        None => run_reconcile(cli.run).await,
    }
}

async fn run_reconcile(options: RunArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    apply_overrides(&mut config, &options);

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?.dry_run(options.dry_run);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current movie before stopping");
            signal_token.cancel();
        }
    });

    let report = controller.run(cancel).await?;
    if report.result.cancelled {
        info!(
            "Stopped early after {} movies",
            report.result.movies_considered
        );
    }

    Ok(())
}

// @modifies: Config with command line values
fn apply_overrides(config: &mut Config, options: &RunArgs) {
    if !options.library_dirs.is_empty() {
        config.use_local_dirs(&options.library_dirs);
    }
    if let Some(naming) = &options.naming {
        config.naming = naming.clone().into();
    }
    if let Some(rescan) = &options.rescan {
        config.rescan = rescan.clone().into();
    }
    if options.no_refresh {
        config.refresh_changed_items = false;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}
