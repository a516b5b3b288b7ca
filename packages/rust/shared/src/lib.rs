//! Shared types, error model, configuration and service seams for ReelMiner.
//!
//! This crate is the foundation depended on by all other ReelMiner crates.
//! It provides:
//! - [`ReelMinerError`]: the unified error type
//! - Domain types ([`Keyword`], [`CatalogVideo`], [`SourceDocument`], [`RunId`])
//! - Configuration ([`AppConfig`], [`RunSettings`], config loading)
//! - Service traits ([`DocumentSource`], [`RemoteStore`], [`VideoCatalog`], [`Notifier`])

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ArchiveConfig, ArchiveSettings, BackoffKind, CatalogConfig, DriveConfig,
    EmailConfig, EmailSettings, KeywordsConfig, RunOverrides, RunSettings, StateConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{ReelMinerError, Result};
pub use services::{DocumentSource, Notifier, RemoteStore, VideoCatalog};
pub use types::{
    CatalogVideo, DownloadedAsset, Keyword, RemoteFile, RunId, SourceDocument, UploadSummary,
    VideoFile,
};
