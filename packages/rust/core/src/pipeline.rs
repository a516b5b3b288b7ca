//! End-to-end run: document → keywords → filter → resolve → persist → publish → notify.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{error, info, instrument, warn};

use reelminer_catalog::{RemoteListing, Sleeper, VideoResolver};
use reelminer_keywords::{ExtractOptions, KeywordFilter, extract_keywords};
use reelminer_shared::{
    DocumentSource, Keyword, Notifier, RemoteStore, Result, RunId, VideoCatalog,
};
use reelminer_storage::HistoryStore;

use crate::publish::{publish, reset_scratch_dir};
use crate::report::{QueryReport, QueryResult, RunOutcome, RunReport, failure_notification};

/// Static inputs of a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Folder watched for the keyword document.
    pub docs_folder_id: String,
    /// Folder receiving new videos.
    pub videos_folder_id: String,
    pub extract: ExtractOptions,
    /// Local download directory; emptied at the start of every run.
    pub scratch_dir: PathBuf,
}

/// Mutable state threaded through a run.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: RunId,
    pub state: HistoryStore,
    /// Name of the document once it has been resolved.
    pub document: Option<String>,
}

impl RunContext {
    pub fn new(state: HistoryStore) -> Self {
        Self {
            run_id: RunId::new(),
            state,
            document: None,
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each query is resolved.
    fn query_started(&self, query: &Keyword, current: usize, total: usize);
    /// Called when the run completes without error.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn query_started(&self, _query: &Keyword, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// The scheduled job, wired to its collaborators.
pub struct Pipeline<D, R, C, N, S> {
    config: PipelineConfig,
    source: D,
    store: R,
    resolver: VideoResolver<C, S>,
    filter: KeywordFilter,
    notifier: N,
}

impl<D, R, C, N, S> Pipeline<D, R, C, N, S>
where
    D: DocumentSource,
    R: RemoteStore,
    C: VideoCatalog,
    N: Notifier,
    S: Sleeper,
{
    pub fn new(
        config: PipelineConfig,
        source: D,
        store: R,
        resolver: VideoResolver<C, S>,
        filter: KeywordFilter,
        notifier: N,
    ) -> Self {
        Self {
            config,
            source,
            store,
            resolver,
            filter,
            notifier,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run once and notify the outcome.
    ///
    /// Per-query search failures and upload failures are part of the report.
    /// Any other error flushes state best-effort, sends a failure
    /// notification and is returned.
    #[instrument(skip_all, fields(run_id = %ctx.run_id))]
    pub async fn run(
        &mut self,
        ctx: &mut RunContext,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let start = Instant::now();
        info!("starting run");

        match self.execute(ctx, progress).await {
            Ok(mut report) => {
                report.elapsed = start.elapsed();
                progress.phase("Sending notification");
                self.notifier
                    .notify(&report.subject(), &report.body())
                    .await;
                info!(
                    outcome = ?report.outcome,
                    queries = report.queries.len(),
                    downloaded = report.downloaded().len(),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "run finished"
                );
                progress.done(&report);
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, document = ?ctx.document, "run failed");
                if let Err(flush_err) = ctx.state.flush() {
                    warn!(error = %flush_err, "state flush after failure also failed");
                }
                let (subject, body) =
                    failure_notification(&ctx.run_id, ctx.document.as_deref(), &e);
                self.notifier.notify(&subject, &body).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &mut self,
        ctx: &mut RunContext,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let mut report = RunReport::new(ctx.run_id.clone());
        reset_scratch_dir(&self.config.scratch_dir)?;

        // --- Phase 1: Document ---
        progress.phase("Fetching latest document");
        let Some(document) = self
            .source
            .latest_document(&self.config.docs_folder_id)
            .await?
        else {
            info!("no document in the watched folder");
            report.outcome = RunOutcome::NoDocument;
            return Ok(report);
        };
        ctx.document = Some(document.name.clone());
        report.document = Some(document.name.clone());

        // --- Phase 2: Keywords ---
        progress.phase("Extracting keywords");
        let candidates = extract_keywords(&document.text, &self.config.extract);
        ctx.state
            .record_extraction(&document.name, candidates.clone());

        report.filter = self
            .filter
            .apply(&candidates, ctx.state.used(), ctx.state.history());
        info!(
            document = %document.name,
            candidates = candidates.len(),
            kept = report.filter.kept.len(),
            removed = report.filter.removed.len(),
            "keywords filtered"
        );
        report.candidates = candidates;

        // --- Phase 3: Resolve ---
        if !report.filter.kept.is_empty() {
            progress.phase("Listing remote videos");
            let mut listing = RemoteListing::from(
                self.store
                    .list_filenames(&self.config.videos_folder_id)
                    .await?,
            );

            let total = report.filter.kept.len();
            for (i, query) in report.filter.kept.iter().enumerate() {
                progress.query_started(query, i + 1, total);
                let result = match self.resolver.resolve(query, &mut listing).await {
                    Ok(outcome) => {
                        if outcome.has_new_info() {
                            ctx.state.mark_used(query.clone());
                        }
                        QueryResult::Resolved(outcome)
                    }
                    Err(e) => {
                        warn!(query = %query, error = %e, "query failed, continuing");
                        QueryResult::Failed(e.to_string())
                    }
                };
                report.queries.push(QueryReport {
                    query: query.clone(),
                    result,
                });
            }
        }

        // --- Phase 4: Persist ---
        progress.phase("Saving state");
        ctx.state.flush()?;

        // --- Phase 5: Publish ---
        progress.phase("Uploading videos");
        report.outcome = publish(
            &self.store,
            &self.config.scratch_dir,
            &self.config.videos_folder_id,
            report.has_new_info(),
        )
        .await;

        Ok(report)
    }
}
