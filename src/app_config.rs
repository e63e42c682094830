use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;
use crate::model::LibraryRoot;
pub use crate::reconcile::NamingMode;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Where movies and library roots come from
    #[serde(default)]
    pub host: HostConfig,

    /// How sibling filenames are built
    #[serde(default)]
    pub naming: NamingMode,

    /// When to ask the host for a full library rescan
    #[serde(default)]
    pub rescan: RescanPolicy,

    /// Ask the host to refresh each movie that got new subtitles
    #[serde(default = "default_refresh_changed_items")]
    pub refresh_changed_items: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Media host selection
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostConfig {
    // @host: Plain directories on disk
    Local {
        #[serde(default)]
        libraries: Vec<LibraryRoot>,
    },
    // @host: Jellyfin server
    Jellyfin {
        /// Server URL, e.g. http://localhost:8096
        #[serde(default = "default_jellyfin_url")]
        url: String,

        /// API key from the Jellyfin dashboard
        #[serde(default = "String::new")]
        api_key: String,

        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::Local {
            libraries: Vec::new(),
        }
    }
}

impl HostConfig {
    // @returns: Lowercase host identifier
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Jellyfin { .. } => "jellyfin",
        }
    }
}

/// When a full library rescan is requested after a run
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RescanPolicy {
    /// After every completed run
    #[default]
    Always,
    /// Only if at least one subtitle was linked or copied
    WhenChanged,
    /// Never; refreshing is left to the host's own schedule
    Never,
}

impl RescanPolicy {
    /// Whether the policy asks for a rescan given the run's change flag
    pub fn wants_rescan(&self, changed: bool) -> bool {
        match self {
            Self::Always => true,
            Self::WhenChanged => changed,
            Self::Never => false,
        }
    }
}

impl std::fmt::Display for RescanPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Always => "always",
            Self::WhenChanged => "when_changed",
            Self::Never => "never",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            host: HostConfig::default(),
            naming: NamingMode::default(),
            rescan: RescanPolicy::default(),
            refresh_changed_items: default_refresh_changed_items(),
            log_level: LogLevel::default(),
        }
    }
}

fn default_refresh_changed_items() -> bool {
    true
}

fn default_jellyfin_url() -> String {
    "http://localhost:8096".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load the configuration at `path`, writing a default one first if the file is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Read and parse a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        serde_json::from_str(&content)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        FileManager::write_to_file(path, &config_json)
            .context(format!("Failed to write config to file: {}", path.display()))
    }

    /// Replace the host with local libraries, one per directory
    pub fn use_local_dirs(&mut self, dirs: &[PathBuf]) {
        let libraries = dirs
            .iter()
            .map(|dir| {
                let name = dir
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| dir.display().to_string());
                LibraryRoot::new(name, vec![dir.clone()])
            })
            .collect();
        self.host = HostConfig::Local { libraries };
    }

    pub fn validate(&self) -> Result<()> {
        match &self.host {
            HostConfig::Local { libraries } => {
                if libraries.is_empty() {
                    return Err(anyhow!(
                        "No local libraries configured; add some to the config or pass library directories"
                    ));
                }
                if let Some(library) = libraries.iter().find(|library| library.locations.is_empty()) {
                    return Err(anyhow!("Library '{}' has no locations", library.name));
                }
            }
            HostConfig::Jellyfin { url, api_key, .. } => {
                if url.trim().is_empty() {
                    return Err(anyhow!("Jellyfin URL is required"));
                }
                url::Url::parse(url).map_err(|e| anyhow!("Invalid Jellyfin URL '{}': {}", url, e))?;
                if api_key.trim().is_empty() {
                    return Err(anyhow!("Jellyfin API key is required"));
                }
            }
        }

        Ok(())
    }
}
