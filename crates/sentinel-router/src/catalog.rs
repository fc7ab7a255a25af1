//! External media catalog behind the `movie` search and format menus.
//!
//! [`ArchiveCatalog`] talks to the Internet Archive's public API:
//! `advancedsearch.php` for title search, `/metadata/{id}` for an item's file
//! list and `/download/{id}/{file}` for the bytes.

use std::time::Duration;

use async_trait::async_trait;
use sentinel_platform::bridge::Timeouts;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("sentinel/", env!("CARGO_PKG_VERSION"));

/// Extensions kept on the format menu.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".webm"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection refused or timed out.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("catalog API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed catalog response: {0}")]
    Parse(String),

    /// The file exceeds the configured download limit.
    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub identifier: String,
    pub title: String,
    pub year: Option<String>,
    pub downloads: u64,
}

impl CatalogItem {
    /// `Title (Year)`, or just the title when the year is unknown.
    pub fn display_title(&self) -> String {
        match &self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// One downloadable file of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFile {
    pub name: String,
    pub format: Option<String>,
    pub size: Option<u64>,
}

impl CatalogFile {
    pub fn is_video(&self) -> bool {
        let lower = self.name.to_lowercase();
        VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }

    pub fn mime_type(&self) -> &'static str {
        mime_for(&self.name)
    }

    /// Size in MiB with one decimal, or `?` when unknown.
    pub fn size_label(&self) -> String {
        match self.size {
            Some(bytes) => format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)),
            None => "?".to_string(),
        }
    }
}

/// Mime type of a video file, by extension.
pub fn mime_for(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.ends_with(".mkv") {
        "video/x-matroska"
    } else if lower.ends_with(".webm") {
        "video/webm"
    } else {
        "video/mp4"
    }
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Search by title, most downloaded first.
    async fn search(&self, query: &str, rows: usize) -> Result<Vec<CatalogItem>, CatalogError>;

    /// Video files of `identifier`, largest first.
    async fn files(&self, identifier: &str) -> Result<Vec<CatalogFile>, CatalogError>;

    /// Public URL of one file.
    fn download_url(&self, identifier: &str, file: &str) -> String;

    /// Fetch a file, failing with [`CatalogError::TooLarge`] once more than
    /// `max_bytes` would be read.
    async fn download(
        &self,
        identifier: &str,
        file: &str,
        max_bytes: u64,
    ) -> Result<Vec<u8>, CatalogError>;
}

pub struct ArchiveCatalog {
    client: reqwest::Client,
    base_url: String,
    timeouts: Timeouts,
}

impl ArchiveCatalog {
    /// Search and metadata lookups get `timeouts.control`; file downloads get
    /// `timeouts.transfer`.
    pub fn new(base_url: impl Into<String>, timeouts: Timeouts) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeouts.control)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeouts,
        })
    }

    fn search_url(&self, query: &str, rows: usize) -> String {
        let q = format!("title:({}) AND mediatype:(movies)", query);
        format!(
            "{}/advancedsearch.php?q={}&fl[]=identifier&fl[]=title&fl[]=year&fl[]=downloads&sort[]=downloads+desc&output=json&rows={}",
            self.base_url,
            urlencoding::encode(&q),
            rows
        )
    }

    fn request(&self, url: &str, budget: Duration) -> reqwest::RequestBuilder {
        self.client.get(url).timeout(budget)
    }

    fn download_request(&self, identifier: &str, file: &str) -> reqwest::RequestBuilder {
        self.request(&self.download_url(identifier, file), self.timeouts.transfer)
    }

    async fn get(&self, url: &str, budget: Duration) -> Result<reqwest::Response, CatalogError> {
        self.send(self.request(url, budget), url).await
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, CatalogError> {
        let resp = req.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                CatalogError::Unavailable(e.to_string())
            } else {
                CatalogError::Http(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = %status, url = %url, "catalog returned an error");
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Catalog for ArchiveCatalog {
    async fn search(&self, query: &str, rows: usize) -> Result<Vec<CatalogItem>, CatalogError> {
        let url = self.search_url(query, rows);
        debug!(query = %query, rows, "catalog search");
        let body: Value = self
            .get(&url, self.timeouts.control)
            .await?
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        parse_search(&body)
    }

    async fn files(&self, identifier: &str) -> Result<Vec<CatalogFile>, CatalogError> {
        let url = format!("{}/metadata/{}", self.base_url, urlencoding::encode(identifier));
        let body: Value = self
            .get(&url, self.timeouts.control)
            .await?
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(video_files(parse_files(&body)?))
    }

    fn download_url(&self, identifier: &str, file: &str) -> String {
        let path: Vec<String> = file
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/download/{}/{}",
            self.base_url,
            urlencoding::encode(identifier),
            path.join("/")
        )
    }

    async fn download(
        &self,
        identifier: &str,
        file: &str,
        max_bytes: u64,
    ) -> Result<Vec<u8>, CatalogError> {
        let url = self.download_url(identifier, file);
        let mut resp = self.send(self.download_request(identifier, file), &url).await?;

        if let Some(size) = resp.content_length() {
            if size > max_bytes {
                return Err(CatalogError::TooLarge {
                    size,
                    limit: max_bytes,
                });
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            let size = (bytes.len() + chunk.len()) as u64;
            if size > max_bytes {
                return Err(CatalogError::TooLarge {
                    size,
                    limit: max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        debug!(identifier = %identifier, file = %file, bytes = bytes.len(), "catalog download complete");
        Ok(bytes)
    }
}

// ── response decoding ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<Value>,
}

/// Decode an `advancedsearch.php` response. `year` and `downloads` arrive as
/// strings or numbers depending on the item.
fn parse_search(body: &Value) -> Result<Vec<CatalogItem>, CatalogError> {
    let envelope: SearchEnvelope =
        serde_json::from_value(body.clone()).map_err(|e| CatalogError::Parse(e.to_string()))?;
    let items = envelope
        .response
        .docs
        .iter()
        .filter_map(|doc| {
            let identifier = scalar(doc.get("identifier"))?;
            let title = scalar(doc.get("title")).unwrap_or_else(|| identifier.clone());
            Some(CatalogItem {
                identifier,
                title,
                year: scalar(doc.get("year")),
                downloads: number(doc.get("downloads")).unwrap_or(0),
            })
        })
        .collect();
    Ok(items)
}

fn parse_files(body: &Value) -> Result<Vec<CatalogFile>, CatalogError> {
    let files = body
        .get("files")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::Parse("metadata has no file list".to_string()))?;
    Ok(files
        .iter()
        .filter_map(|f| {
            Some(CatalogFile {
                name: scalar(f.get("name"))?,
                format: scalar(f.get("format")),
                size: number(f.get("size")),
            })
        })
        .collect())
}

/// Keep video files, largest first.
pub fn video_files(files: Vec<CatalogFile>) -> Vec<CatalogFile> {
    let mut videos: Vec<CatalogFile> = files.into_iter().filter(CatalogFile::is_video).collect();
    videos.sort_by(|a, b| b.size.unwrap_or(0).cmp(&a.size.unwrap_or(0)));
    videos
}

fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => scalar(items.first()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
