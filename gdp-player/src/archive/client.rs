//! archive.org API client
//!
//! Three endpoints are used, all relative to the configured base URL:
//! - `advancedsearch.php` to find shows mentioning a song
//! - `metadata/{identifier}` to list a show's files
//! - `download/{identifier}/{file}` to fetch an audio file

use super::models::{AudioFileEntry, SearchResponse, ShowMetadata};
use super::ArchiveError;
use gdp_common::config::ArchiveSettings;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("gdp-player/", env!("CARGO_PKG_VERSION"));

/// archive.org API client
#[derive(Clone)]
pub struct ArchiveClient {
    http_client: reqwest::Client,
    base_url: Url,
    settings: ArchiveSettings,
}

impl ArchiveClient {
    pub fn new(settings: ArchiveSettings) -> Result<Self, ArchiveError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| ArchiveError::InvalidUrl(format!("{}: {}", settings.base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(ArchiveError::InvalidUrl(settings.base_url.clone()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ArchiveError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            settings,
        })
    }

    /// Format tag a playable file must carry
    pub fn audio_format(&self) -> &str {
        &self.settings.audio_format
    }

    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, ArchiveError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ArchiveError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Search URL for a song title
    pub fn search_url(&self, song: &str) -> Result<Url, ArchiveError> {
        let mut url = self.endpoint(["advancedsearch.php"])?;
        url.query_pairs_mut()
            .append_pair("q", &format!("{} {}", self.settings.search_prefix, song))
            .append_pair("fl[]", "identifier")
            .append_pair("rows", &self.settings.search_rows.to_string())
            .append_pair("page", "1")
            .append_pair("output", "json");
        Ok(url)
    }

    pub fn metadata_url(&self, show: &str) -> Result<Url, ArchiveError> {
        self.endpoint(["metadata", show])
    }

    /// Download URL; `/` inside the file name keeps the show's sub-folders
    pub fn download_url(&self, show: &str, file_name: &str) -> Result<Url, ArchiveError> {
        self.endpoint(["download", show].into_iter().chain(file_name.split('/')))
    }

    /// Identifiers of shows matching the song, in response order
    pub async fn search_shows(&self, song: &str) -> Result<Vec<String>, ArchiveError> {
        let url = self.search_url(song)?;
        debug!(song = %song, url = %url, "Searching archive");

        let response: SearchResponse = self.get_json(url).await?;
        let shows = response.identifiers();

        info!(song = %song, shows = shows.len(), "Archive search complete");
        Ok(shows)
    }

    pub async fn fetch_show_metadata(&self, show: &str) -> Result<ShowMetadata, ArchiveError> {
        let url = self.metadata_url(show)?;
        debug!(show = %show, url = %url, "Fetching show metadata");

        let metadata: ShowMetadata = self.get_json(url).await?;
        debug!(show = %show, files = metadata.files.len(), "Show metadata received");
        Ok(metadata)
    }

    /// Stream an audio file into `dest_dir`
    ///
    /// Returns the written path. A partially written file is removed on error.
    pub async fn download_file(
        &self,
        show: &str,
        entry: &AudioFileEntry,
        dest_dir: &Path,
    ) -> Result<PathBuf, ArchiveError> {
        let url = self.download_url(show, &entry.name)?;
        let path = dest_dir.join(local_file_name(&entry.name));

        info!(show = %show, url = %url, path = %path.display(), "Downloading audio file");

        tokio::fs::create_dir_all(dest_dir).await?;

        let mut response = self.send(url).await?;
        let mut file = tokio::fs::File::create(&path).await?;

        let written: Result<u64, ArchiveError> = async {
            let mut total = 0u64;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| ArchiveError::Network(e.to_string()))?
            {
                file.write_all(&chunk).await?;
                total += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(total)
        }
        .await;
        drop(file);

        match written {
            Ok(bytes) => {
                info!(path = %path.display(), bytes, "Download complete");
                Ok(path)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove partial download {}: {}", path.display(), rm);
                }
                Err(e)
            }
        }
    }

    async fn send(&self, url: Url) -> Result<Response, ArchiveError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ArchiveError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Api(status.as_u16(), error_text));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ArchiveError> {
        let body = self
            .send(url)
            .await?
            .text()
            .await
            .map_err(|e| ArchiveError::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| ArchiveError::Parse(e.to_string()))
    }
}

/// Name the downloaded file gets on disk
///
/// Sub-folders of the archive path are dropped; a name without an
/// extension gets `.mp3` so the decoder can probe it by extension.
pub fn local_file_name(entry_name: &str) -> String {
    let base = entry_name.rsplit(['/', '\\']).next().unwrap_or(entry_name);
    let base = match base {
        "" | "." | ".." => "audio",
        other => other,
    };

    if Path::new(base).extension().is_some() {
        base.to_string()
    } else {
        format!("{}.mp3", base)
    }
}
