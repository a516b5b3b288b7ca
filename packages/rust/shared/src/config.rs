//! Application configuration for ReelMiner.
//!
//! The config file is looked up at `--config`, then `./reelminer.toml`, then
//! `~/.reelminer/reelminer.toml`. It only ever names environment variables
//! for secrets and folder ids; [`RunSettings::resolve`] reads them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReelMinerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "reelminer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".reelminer";

/// Largest page the catalog API serves.
const MAX_CATALOG_PAGE_SIZE: u32 = 80;

// ---------------------------------------------------------------------------
// Config structs (matching reelminer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Keyword extraction and filtering.
    #[serde(default)]
    pub keywords: KeywordsConfig,

    /// Video catalog search and download pacing.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Remote storage folders and credentials.
    #[serde(default)]
    pub drive: DriveConfig,

    /// Local state files.
    #[serde(default)]
    pub state: StateConfig,

    /// Outcome email.
    #[serde(default)]
    pub email: EmailConfig,

    /// Per-document video archives.
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl AppConfig {
    /// Reject values no run can work with.
    pub fn validate(&self) -> Result<()> {
        if self.keywords.marker.trim().is_empty() {
            return Err(ReelMinerError::validation("keywords.marker must not be blank"));
        }
        if self.keywords.tail_len == 0 {
            return Err(ReelMinerError::validation("keywords.tail_len must be at least 1"));
        }
        if self.catalog.page_size == 0 || self.catalog.page_size > MAX_CATALOG_PAGE_SIZE {
            return Err(ReelMinerError::validation(format!(
                "catalog.page_size must be between 1 and {MAX_CATALOG_PAGE_SIZE}"
            )));
        }
        if self.catalog.max_page == 0 {
            return Err(ReelMinerError::validation("catalog.max_page must be at least 1"));
        }
        if self.archive.per_keyword == 0 {
            return Err(ReelMinerError::validation("archive.per_keyword must be at least 1"));
        }
        Ok(())
    }
}

/// `[keywords]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Marker line after which every token is a candidate.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Number of trailing tokens used when no marker line exists.
    #[serde(default = "default_tail_len")]
    pub tail_len: usize,

    /// Keywords seen more often than this across history are dropped.
    #[serde(default = "default_frequency_cap")]
    pub frequency_cap: usize,

    /// Stopword list: `es` or `en`.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            tail_len: default_tail_len(),
            frequency_cap: default_frequency_cap(),
            language: default_language(),
        }
    }
}

fn default_marker() -> String {
    "KEYWORDS".into()
}
fn default_tail_len() -> usize {
    10
}
fn default_frequency_cap() -> usize {
    15
}
fn default_language() -> String {
    "es".into()
}

/// Backoff shape between empty-result searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Name of the env var holding the catalog API key.
    #[serde(default = "default_catalog_key_env")]
    pub api_key_env: String,

    /// API base URL.
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Results requested per search page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Search pages are drawn uniformly from `1..=max_page`.
    #[serde(default = "default_max_page")]
    pub max_page: u32,

    /// Extra searches allowed after an empty page.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay before re-searching an empty page.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// How the retry delay grows.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: BackoffKind,

    /// Pause between asset download attempts.
    #[serde(default = "default_download_delay")]
    pub download_delay_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_catalog_key_env(),
            base_url: default_catalog_base_url(),
            page_size: default_page_size(),
            max_page: default_max_page(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            retry_backoff: default_retry_backoff(),
            download_delay_ms: default_download_delay(),
        }
    }
}

impl CatalogConfig {
    /// Retry delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Download delay as a [`Duration`].
    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

fn default_catalog_key_env() -> String {
    "PEXELS_API_KEY".into()
}
fn default_catalog_base_url() -> String {
    "https://api.pexels.com".into()
}
fn default_page_size() -> u32 {
    4
}
fn default_max_page() -> u32 {
    4
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    2_000
}
fn default_retry_backoff() -> BackoffKind {
    BackoffKind::Fixed
}
fn default_download_delay() -> u64 {
    5_000
}

/// `[drive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Env var holding the id of the folder watched for documents.
    #[serde(default = "default_docs_folder_env")]
    pub docs_folder_id_env: String,

    /// Env var holding the id of the folder receiving videos.
    #[serde(default = "default_videos_folder_env")]
    pub videos_folder_id_env: String,

    /// Env var holding the service-account JSON itself.
    #[serde(default = "default_credentials_env")]
    pub credentials_env: String,

    /// Fallback service-account file when the env var is unset.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            docs_folder_id_env: default_docs_folder_env(),
            videos_folder_id_env: default_videos_folder_env(),
            credentials_env: default_credentials_env(),
            credentials_file: default_credentials_file(),
        }
    }
}

fn default_docs_folder_env() -> String {
    "DOCS_FOLDER_ID".into()
}
fn default_videos_folder_env() -> String {
    "VIDEOS_FOLDER_ID".into()
}
fn default_credentials_env() -> String {
    "GCP_CREDENTIALS".into()
}
fn default_credentials_file() -> String {
    "credentials.json".into()
}

/// `[state]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Per-document keyword history (JSON object).
    #[serde(default = "default_history_file")]
    pub history_file: String,

    /// Used keywords, one per line.
    #[serde(default = "default_used_file")]
    pub used_file: String,

    /// Local directory for this run's downloads.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            history_file: default_history_file(),
            used_file: default_used_file(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

fn default_history_file() -> String {
    "keywords_dict.json".into()
}
fn default_used_file() -> String {
    "used_keywords.txt".into()
}
fn default_scratch_dir() -> String {
    "temp_videos".into()
}

/// `[email]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Env var holding the recipient address.
    #[serde(default = "default_recipient_env")]
    pub recipient_env: String,

    /// SMTP relay host (implicit TLS).
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Env var holding the SMTP user (also the sender address).
    #[serde(default = "default_user_env")]
    pub user_env: String,

    /// Env var holding the SMTP password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            recipient_env: default_recipient_env(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            user_env: default_user_env(),
            password_env: default_password_env(),
        }
    }
}

fn default_recipient_env() -> String {
    "RECIPIENT_EMAIL".into()
}
fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    465
}
fn default_user_env() -> String {
    "GMAIL_USER".into()
}
fn default_password_env() -> String {
    "GMAIL_APP_PASSWORD".into()
}

/// `[archive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Local working directory, removed once the archive is uploaded.
    #[serde(default = "default_archive_dir")]
    pub work_dir: String,

    /// Most clips collected per keyword.
    #[serde(default = "default_per_keyword")]
    pub per_keyword: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            work_dir: default_archive_dir(),
            per_keyword: default_per_keyword(),
        }
    }
}

fn default_archive_dir() -> String {
    "temp_archive".into()
}
fn default_per_keyword() -> u32 {
    4
}

// ---------------------------------------------------------------------------
// Run settings (config + environment)
// ---------------------------------------------------------------------------

/// SMTP settings, present only when every email variable is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub recipient: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub user: String,
    pub password: String,
}

/// Values taken from CLI flags that win over the environment.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub docs_folder_id: Option<String>,
    pub videos_folder_id: Option<String>,
}

/// Everything a run needs from the environment, validated up front.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub docs_folder_id: String,
    pub videos_folder_id: String,
    pub catalog_api_key: String,
    /// Service-account JSON document.
    pub service_account_json: String,
    /// `None` means notifications are only logged.
    pub email: Option<EmailSettings>,
}

impl RunSettings {
    /// Resolve settings from the process environment.
    pub fn resolve(config: &AppConfig, overrides: &RunOverrides) -> Result<Self> {
        Self::resolve_with(config, overrides, |name| std::env::var(name).ok())
    }

    /// Resolve settings using `lookup` for environment variables.
    ///
    /// Fails with [`ReelMinerError::Config`] naming the first missing variable.
    pub fn resolve_with(
        config: &AppConfig,
        overrides: &RunOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &str| {
            get(name).ok_or_else(|| {
                ReelMinerError::config(format!("environment variable {name} is not set"))
            })
        };

        let docs_folder_id = match &overrides.docs_folder_id {
            Some(id) => id.clone(),
            None => require(&config.drive.docs_folder_id_env)?,
        };
        let videos_folder_id = match &overrides.videos_folder_id {
            Some(id) => id.clone(),
            None => require(&config.drive.videos_folder_id_env)?,
        };
        let catalog_api_key = require(&config.catalog.api_key_env)?;

        let service_account_json = drive_credentials(config, &get)?;

        let email = match (
            get(&config.email.recipient_env),
            get(&config.email.user_env),
            get(&config.email.password_env),
        ) {
            (Some(recipient), Some(user), Some(password)) => Some(EmailSettings {
                recipient,
                smtp_host: config.email.smtp_host.clone(),
                smtp_port: config.email.smtp_port,
                user,
                password,
            }),
            _ => {
                tracing::warn!(
                    recipient_env = %config.email.recipient_env,
                    user_env = %config.email.user_env,
                    "email settings incomplete, notifications will only be logged"
                );
                None
            }
        };

        Ok(Self {
            docs_folder_id,
            videos_folder_id,
            catalog_api_key,
            service_account_json,
            email,
        })
    }
}

/// What `reelminer archive` needs: the videos folder and Drive credentials.
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub videos_folder_id: String,
    /// Service-account JSON document.
    pub service_account_json: String,
}

impl ArchiveSettings {
    /// Resolve settings from the process environment.
    pub fn resolve(config: &AppConfig, overrides: &RunOverrides) -> Result<Self> {
        Self::resolve_with(config, overrides, |name| std::env::var(name).ok())
    }

    /// Resolve settings using `lookup` for environment variables.
    pub fn resolve_with(
        config: &AppConfig,
        overrides: &RunOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let videos_folder_id = match &overrides.videos_folder_id {
            Some(id) => id.clone(),
            None => get(&config.drive.videos_folder_id_env).ok_or_else(|| {
                ReelMinerError::config(format!(
                    "environment variable {} is not set",
                    config.drive.videos_folder_id_env
                ))
            })?,
        };
        let service_account_json = drive_credentials(config, &get)?;
        Ok(Self {
            videos_folder_id,
            service_account_json,
        })
    }
}

/// Service-account JSON from the credentials env var, else the credentials file.
fn drive_credentials(config: &AppConfig, get: impl Fn(&str) -> Option<String>) -> Result<String> {
    if let Some(json) = get(&config.drive.credentials_env) {
        return Ok(json);
    }
    let path = Path::new(&config.drive.credentials_file);
    if !path.exists() {
        return Err(ReelMinerError::config(format!(
            "no Drive credentials: set {} or provide {}",
            config.drive.credentials_env,
            path.display()
        )));
    }
    std::fs::read_to_string(path).map_err(|e| ReelMinerError::io(path, e))
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.reelminer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReelMinerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.reelminer/reelminer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config.
///
/// An explicit path must exist. Otherwise `./reelminer.toml` is tried, then
/// the user config file; if neither exists, defaults are returned.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    let path = config_file_path()?;
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReelMinerError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| ReelMinerError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReelMinerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReelMinerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReelMinerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
