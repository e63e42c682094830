use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::errors::HostError;
use crate::model::{LibraryRoot, MovieEntry};

use super::MediaHost;

/// Key of the scheduled task Jellyfin runs for a library scan
const LIBRARY_SCAN_TASK_KEY: &str = "RefreshLibrary";

/// Header carrying the API key
const TOKEN_HEADER: &str = "X-Emby-Token";

/// Jellyfin server client
#[derive(Debug, Clone)]
pub struct JellyfinHost {
    /// Server URL, always ending in '/' so relative joins keep any base path
    base_url: Url,
    /// API key created in the Jellyfin dashboard
    api_key: String,
    /// HTTP client for making requests
    client: Client,
}

/// Page of items from `/Items`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<ItemDto>,
}

/// Movie item as returned with `Fields=Path`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
}

/// Library as returned by `/Library/VirtualFolders`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualFolderDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub locations: Vec<String>,
}

/// Scheduled task as returned by `/ScheduledTasks`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduledTaskDto {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub state: String,
}

impl From<ItemDto> for MovieEntry {
    fn from(item: ItemDto) -> Self {
        let is_valid = !item
            .location_type
            .as_deref()
            .is_some_and(|location| location.eq_ignore_ascii_case("Virtual"));
        MovieEntry {
            id: Some(item.id),
            name: item.name,
            path: item.path.map(PathBuf::from).unwrap_or_default(),
            is_valid,
        }
    }
}

impl From<VirtualFolderDto> for LibraryRoot {
    fn from(folder: VirtualFolderDto) -> Self {
        LibraryRoot {
            name: folder.name,
            locations: folder.locations.into_iter().map(PathBuf::from).collect(),
        }
    }
}

/// True when the library scan task is anything but idle
pub fn scan_running(tasks: &[ScheduledTaskDto]) -> bool {
    tasks
        .iter()
        .any(|task| task.key == LIBRARY_SCAN_TASK_KEY && !task.state.eq_ignore_ascii_case("Idle"))
}

impl JellyfinHost {
    /// Create a client for the server at `url`
    pub fn new(url: &str, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, HostError> {
        let mut base_url = Url::parse(url)
            .map_err(|e| HostError::RequestFailed(format!("Invalid Jellyfin URL '{}': {}", url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| HostError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client,
        })
    }

    /// Absolute URL for an API path such as `Library/Refresh`
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, HostError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| HostError::RequestFailed(format!("Invalid endpoint '{}': {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HostError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| HostError::ParseError(e.to_string()))
    }

    async fn post(&self, url: Url) -> Result<(), HostError> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }
}

fn transport_error(error: reqwest::Error) -> HostError {
    if error.is_connect() || error.is_timeout() {
        HostError::ConnectionError(error.to_string())
    } else {
        HostError::RequestFailed(error.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, HostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(HostError::AuthenticationError(format!(
            "{} (check the API key)",
            status
        ))),
        _ => Err(HostError::ApiError {
            status_code: status.as_u16(),
            message,
        }),
    }
}

#[async_trait]
impl MediaHost for JellyfinHost {
    fn name(&self) -> &str {
        "jellyfin"
    }

    async fn list_movies(&self) -> Result<Vec<MovieEntry>, HostError> {
        let url = self.endpoint(
            "Items",
            &[
                ("IncludeItemTypes", "Movie"),
                ("Recursive", "true"),
                ("IsVirtualItem", "false"),
                ("SortBy", "SortName"),
                ("SortOrder", "Ascending"),
                ("Fields", "Path"),
            ],
        )?;
        let page: ItemsResponse = self.get_json(url).await?;
        Ok(page.items.into_iter().map(MovieEntry::from).collect())
    }

    async fn list_library_roots(&self) -> Result<Vec<LibraryRoot>, HostError> {
        let url = self.endpoint("Library/VirtualFolders", &[])?;
        let folders: Vec<VirtualFolderDto> = self.get_json(url).await?;
        Ok(folders.into_iter().map(LibraryRoot::from).collect())
    }

    async fn is_scan_in_progress(&self) -> Result<bool, HostError> {
        let url = self.endpoint("ScheduledTasks", &[("IsHidden", "false")])?;
        let tasks: Vec<ScheduledTaskDto> = self.get_json(url).await?;
        Ok(scan_running(&tasks))
    }

    async fn request_item_refresh(&self, movie: &MovieEntry) -> Result<(), HostError> {
        let Some(id) = movie.id.as_deref() else {
            debug!("No item id for {}, not refreshing", movie.display_name());
            return Ok(());
        };
        let url = self.endpoint(
            &format!("Items/{}/Refresh", id),
            &[
                ("MetadataRefreshMode", "Default"),
                ("ImageRefreshMode", "Default"),
            ],
        )?;
        self.post(url).await
    }

    async fn request_full_rescan(&self) -> Result<(), HostError> {
        let url = self.endpoint("Library/Refresh", &[])?;
        self.post(url).await
    }
}
