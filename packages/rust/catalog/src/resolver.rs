//! Query → downloaded assets.
//!
//! For one query the resolver searches a random catalog page, retrying empty
//! pages under a [`RetryPolicy`], then downloads every result whose derived
//! filename is not already in the remote listing. Downloads are paced by a
//! fixed delay that applies across the whole run, not per query.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

use reelminer_shared::{CatalogConfig, CatalogVideo, Keyword, ReelMinerError, Result, VideoCatalog};

use crate::retry::{RetryPolicy, Sleeper};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Resolver knobs.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Results requested per search.
    pub page_size: u32,
    /// Pages are drawn from `1..=max_page`.
    pub max_page: u32,
    pub retry: RetryPolicy,
    /// Pause before every download except the first of the run.
    pub download_delay: Duration,
    /// Where downloads are written.
    pub scratch_dir: PathBuf,
}

impl ResolverConfig {
    pub fn from_config(catalog: &CatalogConfig, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            page_size: catalog.page_size,
            max_page: catalog.max_page,
            retry: RetryPolicy::from(catalog),
            download_delay: catalog.download_delay(),
            scratch_dir: scratch_dir.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote listing
// ---------------------------------------------------------------------------

/// Snapshot of filenames already in remote storage, grown as the run
/// downloads new assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteListing {
    names: HashSet<String>,
}

impl RemoteListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.names.contains(filename)
    }

    /// Returns `true` if the name was not listed yet.
    pub fn insert(&mut self, filename: impl Into<String>) -> bool {
        self.names.insert(filename.into())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<HashSet<String>> for RemoteListing {
    fn from(names: HashSet<String>) -> Self {
        Self { names }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How the search phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A page with results was found after `attempts` searches.
    Found { attempts: u32, results: usize },
    /// Every allowed search came back empty.
    Exhausted { attempts: u32 },
}

impl SearchOutcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            Self::Found { attempts, .. } | Self::Exhausted { attempts } => attempts,
        }
    }
}

/// An asset that was attempted but not saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFailure {
    pub filename: String,
    pub reason: String,
}

/// Everything that happened for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub query: Keyword,
    pub search: SearchOutcome,
    /// Newly saved filenames, in catalog order.
    pub downloaded: Vec<String>,
    /// Results skipped because the listing already had them.
    pub skipped_existing: Vec<String>,
    pub failed_downloads: Vec<DownloadFailure>,
}

impl QueryOutcome {
    /// At least one asset was newly downloaded.
    pub fn has_new_info(&self) -> bool {
        !self.downloaded.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Filenames
// ---------------------------------------------------------------------------

/// Landscape or portrait, from the representative rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            Self::Vertical
        } else {
            Self::Horizontal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

/// Derive `{query}_{w}x{h}_{orientation}_{id}.mp4` from the first rendition.
///
/// Rendition dimensions win; the video's own are used when the rendition
/// omits them. Returns `None` for a video without renditions.
pub fn asset_filename(query: &Keyword, video: &CatalogVideo) -> Option<String> {
    let file = video.video_files.first()?;
    let width = file.width.unwrap_or(video.width);
    let height = file.height.unwrap_or(video.height);
    let orientation = Orientation::from_dimensions(width, height);
    Some(format!(
        "{}_{width}x{height}_{}_{}.mp4",
        query.as_str().replace(' ', "_"),
        orientation.as_str(),
        video.id
    ))
}

/// Whether a response `content-type` names a video payload.
pub fn is_video_content_type(content_type: &str) -> bool {
    let lower = content_type.trim().to_ascii_lowercase();
    lower.starts_with("video/") || lower.contains("mp4")
}

// ---------------------------------------------------------------------------
// VideoResolver
// ---------------------------------------------------------------------------

enum SearchState {
    Searching { retries_left: u32 },
    Found(Vec<CatalogVideo>),
    Exhausted,
}

/// Resolves queries against a [`VideoCatalog`]. One resolver lives for a
/// whole run so the download pacing spans queries.
pub struct VideoResolver<C, S> {
    catalog: C,
    sleeper: S,
    rng: StdRng,
    config: ResolverConfig,
    downloads_attempted: usize,
}

impl<C: VideoCatalog, S: Sleeper> VideoResolver<C, S> {
    pub fn new(catalog: C, sleeper: S, config: ResolverConfig) -> Self {
        Self {
            catalog,
            sleeper,
            rng: StdRng::from_os_rng(),
            config,
            downloads_attempted: 0,
        }
    }

    /// Use a deterministic page sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Download attempts made so far in this run.
    pub fn downloads_attempted(&self) -> usize {
        self.downloads_attempted
    }

    /// Search for `query` and download every result not yet in `listing`.
    ///
    /// An empty search is not an error. A search transport failure is
    /// returned as `Err`; download and local write failures are reported in
    /// the outcome so earlier downloads are kept.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn resolve(
        &mut self,
        query: &Keyword,
        listing: &mut RemoteListing,
    ) -> Result<QueryOutcome> {
        let (search, videos) = self.search(query).await?;

        let mut outcome = QueryOutcome {
            query: query.clone(),
            search,
            downloaded: Vec::new(),
            skipped_existing: Vec::new(),
            failed_downloads: Vec::new(),
        };

        for video in &videos {
            let Some(filename) = asset_filename(query, video) else {
                debug!(video_id = video.id, "video has no renditions, skipping");
                continue;
            };

            if listing.contains(&filename) {
                debug!(%filename, "already in remote storage, skipping");
                outcome.skipped_existing.push(filename);
                continue;
            }

            // asset_filename only returns Some when a rendition exists
            let link = &video.video_files[0].link;
            match self.download(link, &filename).await {
                Ok(()) => {
                    listing.insert(filename.clone());
                    outcome.downloaded.push(filename);
                }
                Err(reason) => {
                    warn!(%filename, %reason, "download skipped");
                    outcome.failed_downloads.push(DownloadFailure { filename, reason });
                }
            }
        }

        info!(
            attempts = outcome.search.attempts(),
            downloaded = outcome.downloaded.len(),
            skipped = outcome.skipped_existing.len(),
            failed = outcome.failed_downloads.len(),
            "query resolved"
        );
        Ok(outcome)
    }

    /// Run the search state machine to completion.
    async fn search(&mut self, query: &Keyword) -> Result<(SearchOutcome, Vec<CatalogVideo>)> {
        let max_retries = self.config.retry.max_retries;
        let mut attempts = 0u32;
        let mut state = SearchState::Searching {
            retries_left: max_retries,
        };

        loop {
            state = match state {
                SearchState::Searching { retries_left } => {
                    let page = self.rng.random_range(1..=self.config.max_page.max(1));
                    attempts += 1;
                    let videos = self
                        .catalog
                        .search(query.as_str(), page, self.config.page_size)
                        .await?;

                    if !videos.is_empty() {
                        SearchState::Found(videos)
                    } else if retries_left == 0 {
                        SearchState::Exhausted
                    } else {
                        let retry = max_retries - retries_left + 1;
                        let delay = self.config.retry.delay_for(retry);
                        debug!(attempt = attempts, page, ?delay, "empty page, retrying");
                        self.sleeper.sleep(delay).await;
                        SearchState::Searching {
                            retries_left: retries_left - 1,
                        }
                    }
                }
                SearchState::Found(videos) => {
                    let results = videos.len();
                    return Ok((SearchOutcome::Found { attempts, results }, videos));
                }
                SearchState::Exhausted => {
                    info!(attempts, "no results");
                    return Ok((SearchOutcome::Exhausted { attempts }, Vec::new()));
                }
            };
        }
    }

    /// One paced download attempt. `Err` carries the reason the asset was
    /// skipped.
    async fn download(&mut self, link: &str, filename: &str) -> std::result::Result<(), String> {
        if self.downloads_attempted > 0 {
            self.sleeper.sleep(self.config.download_delay).await;
        }
        self.downloads_attempted += 1;

        debug!(%filename, "downloading");
        let asset = match self.catalog.download(link).await {
            Ok(asset) => asset,
            Err(e) => return Err(e.to_string()),
        };

        if !asset.is_success() {
            return Err(format!("HTTP {}", asset.status));
        }
        if let Some(content_type) = asset.content_type.as_deref() {
            if !is_video_content_type(content_type) {
                return Err(format!("unexpected content-type {content_type}"));
            }
        }

        write_asset(&self.config.scratch_dir, filename, &asset.bytes)
            .await
            .map_err(|e| format!("write failed: {e}"))?;
        info!(%filename, bytes = asset.bytes.len(), status = asset.status, "downloaded");
        Ok(())
    }
}

async fn write_asset(dir: &Path, filename: &str, bytes: &[u8]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ReelMinerError::io(dir, e))?;
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| ReelMinerError::io(&path, e))
}
