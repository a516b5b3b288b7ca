//! Core pipeline orchestration for ReelMiner.
//!
//! This crate ties together keyword extraction, filtering, video resolution,
//! state persistence and publishing into the scheduled run ([`Pipeline::run`]),
//! and packages the latest document's videos with [`build_archive`].

pub mod archive;
pub mod pipeline;
pub mod publish;
pub mod report;

pub use archive::{ArchiveOutcome, ArchivePlan, build_archive};
pub use pipeline::{Pipeline, PipelineConfig, ProgressReporter, RunContext, SilentProgress};
pub use publish::{publish, reset_scratch_dir};
pub use report::{QueryReport, QueryResult, RunOutcome, RunReport, failure_notification};
