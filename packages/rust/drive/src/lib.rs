//! Google Drive v3 access for ReelMiner.
//!
//! [`DriveClient`] is both the [`DocumentSource`] (latest Google Doc in a
//! folder, exported as plain text) and the [`RemoteStore`] (folder listing,
//! name search, media downloads and multipart uploads). Requests go over plain REST with a bearer token from
//! [`DriveAuth`].

pub mod auth;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use reelminer_shared::{
    DocumentSource, ReelMinerError, RemoteFile, RemoteStore, Result, SourceDocument,
    UploadSummary,
};

pub use auth::{DriveAuth, ServiceAccountKey};

/// Metadata API origin.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Upload API origin.
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com";

const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

/// Files requested per listing page (the API maximum).
const LIST_PAGE_SIZE: u32 = 1000;

/// Timeout for metadata calls.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Timeout for a single media upload or download.
const TRANSFER_TIMEOUT_SECS: u64 = 15 * 60;

/// User-Agent string for Drive requests.
const USER_AGENT: &str = concat!("ReelMiner/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

impl From<DriveFile> for RemoteFile {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
        }
    }
}

// ---------------------------------------------------------------------------
// DriveClient
// ---------------------------------------------------------------------------

/// REST client for the Drive v3 API.
#[derive(Debug)]
pub struct DriveClient {
    client: Client,
    api_base: String,
    upload_base: String,
    auth: DriveAuth,
    transfer_timeout: Duration,
}

impl DriveClient {
    /// Client against the production endpoints.
    pub fn new(auth: DriveAuth) -> Result<Self> {
        Self::with_base_urls(auth, DEFAULT_API_BASE, DEFAULT_UPLOAD_BASE)
    }

    /// Client authenticated by a service-account JSON document.
    pub fn from_service_account_json(json: &str) -> Result<Self> {
        let key = ServiceAccountKey::from_json(json)?;
        Self::new(DriveAuth::service_account(key))
    }

    /// Client against other origins (a mock server in tests).
    pub fn with_base_urls(auth: DriveAuth, api_base: &str, upload_base: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReelMinerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: normalize_base(api_base)?,
            upload_base: normalize_base(upload_base)?,
            auth,
            transfer_timeout: Duration::from_secs(TRANSFER_TIMEOUT_SECS),
        })
    }

    /// Replace the per-request timeout used for uploads and downloads.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn transfer_timeout(&self) -> Duration {
        self.transfer_timeout
    }

    async fn token(&self) -> Result<String> {
        self.auth.access_token(&self.client).await
    }

    /// One `files.list` call.
    async fn list_page(&self, params: &[(&str, &str)]) -> Result<FileList> {
        let url = format!("{}/drive/v3/files", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token().await?)
            .query(params)
            .send()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: {e}")))?;

        let response = ensure_success(response, "files.list").await?;
        response
            .json()
            .await
            .map_err(|e| ReelMinerError::parse(format!("invalid files.list response: {e}")))
    }

    /// Export a Google Doc as plain text.
    async fn export_text(&self, file_id: &str) -> Result<String> {
        let url = format!("{}/drive/v3/files/{file_id}/export", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token().await?)
            .query(&[("mimeType", "text/plain")])
            .send()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: {e}")))?;

        let response = ensure_success(response, "files.export").await?;
        response
            .text()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: failed to read body: {e}")))
    }

    /// Upload a single file with a multipart/related request.
    async fn upload_named(&self, path: &Path, name: &str, folder_id: &str) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ReelMinerError::io(path, e))?;

        let metadata = serde_json::json!({ "name": name, "parents": [folder_id] });
        let boundary = format!("reelminer-{}", Uuid::now_v7().simple());
        let body = multipart_related(&boundary, &metadata.to_string(), mime_for(path), &bytes);

        let url = format!("{}/upload/drive/v3/files", self.upload_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token().await?)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .timeout(self.transfer_timeout)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: {e}")))?;

        let response = ensure_success(response, "files.create").await?;
        let created: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ReelMinerError::parse(format!("invalid files.create response: {e}")))?;
        Ok(created["id"].as_str().unwrap_or_default().to_string())
    }
}

impl DocumentSource for DriveClient {
    #[instrument(skip_all, fields(folder_id = %folder_id))]
    async fn latest_document(&self, folder_id: &str) -> Result<Option<SourceDocument>> {
        let q = format!(
            "{} in parents and mimeType='{GOOGLE_DOC_MIME}' and trashed=false",
            quote(folder_id)
        );
        let list = self
            .list_page(&[
                ("q", q.as_str()),
                ("orderBy", "modifiedTime desc"),
                ("pageSize", "1"),
                ("fields", "files(id,name)"),
            ])
            .await?;

        let Some(file) = list.files.into_iter().next() else {
            info!("folder has no documents");
            return Ok(None);
        };

        let text = self.export_text(&file.id).await?;
        info!(document = %file.name, chars = text.chars().count(), "document exported");
        Ok(Some(SourceDocument {
            id: file.id,
            name: file.name,
            text,
        }))
    }
}

impl RemoteStore for DriveClient {
    #[instrument(skip_all, fields(folder_id = %folder_id))]
    async fn list_filenames(&self, folder_id: &str) -> Result<HashSet<String>> {
        let q = format!("{} in parents and trashed=false", quote(folder_id));
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut names = HashSet::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", q.as_str()),
                ("fields", "nextPageToken,files(id,name)"),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let list = self.list_page(&params).await?;
            names.extend(list.files.into_iter().map(|f| f.name));

            match list.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!(files = names.len(), "remote listing fetched");
        Ok(names)
    }

    #[instrument(skip_all, fields(dir = %local_dir.display(), folder_id = %folder_id))]
    async fn upload_dir(&self, local_dir: &Path, folder_id: &str) -> Result<UploadSummary> {
        let files = regular_files(local_dir)?;
        let mut summary = UploadSummary::default();
        let mut failures: Vec<String> = Vec::new();

        for path in files {
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                warn!(path = %path.display(), "skipping file with non-UTF-8 name");
                continue;
            };

            match self.upload_named(&path, &name, folder_id).await {
                Ok(id) => {
                    debug!(filename = %name, %id, "uploaded");
                    summary.uploaded.push(name);
                }
                Err(e) => {
                    warn!(filename = %name, error = %e, "upload failed");
                    failures.push(format!("{name}: {e}"));
                }
            }
        }

        if !failures.is_empty() {
            return Err(ReelMinerError::Upload(format!(
                "{} of {} files failed ({})",
                failures.len(),
                failures.len() + summary.uploaded.len(),
                failures.join("; ")
            )));
        }

        info!(uploaded = summary.uploaded.len(), "upload complete");
        Ok(summary)
    }

    #[instrument(skip_all, fields(path = %local_path.display(), folder_id = %folder_id))]
    async fn upload_file(&self, local_path: &Path, folder_id: &str) -> Result<String> {
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ReelMinerError::Upload(format!("{} has no UTF-8 file name", local_path.display()))
            })?;
        let id = self
            .upload_named(local_path, name, folder_id)
            .await
            .map_err(|e| ReelMinerError::Upload(format!("{name}: {e}")))?;
        info!(filename = %name, %id, "uploaded");
        Ok(id)
    }

    #[instrument(skip_all, fields(folder_id = %folder_id, fragment = %fragment))]
    async fn find_files(
        &self,
        folder_id: &str,
        fragment: &str,
        limit: u32,
    ) -> Result<Vec<RemoteFile>> {
        let q = format!(
            "{} in parents and trashed=false and name contains {}",
            quote(folder_id),
            quote(fragment)
        );
        let page_size = limit.to_string();
        let list = self
            .list_page(&[
                ("q", q.as_str()),
                ("fields", "files(id,name)"),
                ("pageSize", page_size.as_str()),
            ])
            .await?;

        let files: Vec<RemoteFile> = list
            .files
            .into_iter()
            .take(limit as usize)
            .map(RemoteFile::from)
            .collect();
        debug!(found = files.len(), "name search done");
        Ok(files)
    }

    #[instrument(skip_all, fields(file_id = %file_id, dest = %dest.display()))]
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()> {
        let url = format!("{}/drive/v3/files/{file_id}", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token().await?)
            .query(&[("alt", "media")])
            .timeout(self.transfer_timeout)
            .send()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: {e}")))?;
        let mut response = ensure_success(response, "files.get").await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ReelMinerError::io(dest, e))?;
        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| ReelMinerError::io(dest, e))?;
            written += chunk.len();
        }
        file.flush().await.map_err(|e| ReelMinerError::io(dest, e))?;

        debug!(bytes = written, "downloaded");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_base(base: &str) -> Result<String> {
    let parsed = Url::parse(base)
        .map_err(|e| ReelMinerError::config(format!("invalid Drive base URL '{base}': {e}")))?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Single-quote a value for a Drive `q` expression.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ReelMinerError::Drive(format!(
        "{operation} returned HTTP {status}: {}",
        body.trim()
    )))
}

/// Regular files directly inside `dir`, sorted by name. A missing directory
/// has no files.
fn regular_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| ReelMinerError::io(dir, e))? {
        let entry = entry.map_err(|e| ReelMinerError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

fn multipart_related(boundary: &str, metadata: &str, mime: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
