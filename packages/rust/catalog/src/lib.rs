//! Stock-video catalog access for ReelMiner.
//!
//! This crate provides:
//! - [`PexelsClient`]: the [`VideoCatalog`](reelminer_shared::VideoCatalog) backed by the Pexels API
//! - [`VideoResolver`]: search with bounded retries, dedup against the remote listing, paced downloads
//! - [`RetryPolicy`] / [`Sleeper`]: the retry schedule and the wait seam

pub mod pexels;
pub mod resolver;
pub mod retry;

pub use pexels::PexelsClient;
pub use resolver::{
    DownloadFailure, Orientation, QueryOutcome, RemoteListing, ResolverConfig, SearchOutcome,
    VideoResolver, asset_filename, is_video_content_type,
};
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
