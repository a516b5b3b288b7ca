//! What a run did, and the notification text derived from it.

use std::fmt::Write as _;
use std::time::Duration;

use reelminer_catalog::{QueryOutcome, SearchOutcome};
use reelminer_keywords::FilterOutcome;
use reelminer_shared::{Keyword, ReelMinerError, RunId};

/// Marker prepended to the subject when some queries failed.
const PARTIAL_PREFIX: &str = "[parcial] ";

/// Terminal state of a run that did not error out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The watched folder had no document.
    NoDocument,
    /// Nothing new was downloaded, so nothing was uploaded.
    NoNewInformation,
    /// New videos were uploaded.
    Uploaded { files: Vec<String> },
    /// New videos were downloaded but the upload failed.
    UploadFailed { error: String },
}

/// Result of one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Resolved(QueryOutcome),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReport {
    pub query: Keyword,
    pub result: QueryResult,
}

impl QueryReport {
    pub fn has_new_info(&self) -> bool {
        matches!(&self.result, QueryResult::Resolved(outcome) if outcome.has_new_info())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.result, QueryResult::Failed(_))
    }

    pub fn downloaded(&self) -> &[String] {
        match &self.result {
            QueryResult::Resolved(outcome) => &outcome.downloaded,
            QueryResult::Failed(_) => &[],
        }
    }
}

/// Full account of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub document: Option<String>,
    pub candidates: Vec<Keyword>,
    pub filter: FilterOutcome,
    pub queries: Vec<QueryReport>,
    pub outcome: RunOutcome,
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            document: None,
            candidates: Vec::new(),
            filter: FilterOutcome::default(),
            queries: Vec::new(),
            outcome: RunOutcome::NoNewInformation,
            elapsed: Duration::ZERO,
        }
    }

    /// At least one query downloaded something.
    pub fn has_new_info(&self) -> bool {
        self.queries.iter().any(QueryReport::has_new_info)
    }

    /// Every newly downloaded filename, in download order.
    pub fn downloaded(&self) -> Vec<&str> {
        self.queries
            .iter()
            .flat_map(|q| q.downloaded().iter().map(String::as_str))
            .collect()
    }

    /// Queries whose search failed.
    pub fn failed_queries(&self) -> Vec<&QueryReport> {
        self.queries.iter().filter(|q| q.is_failed()).collect()
    }

    /// Some queries or downloads failed while the run still completed.
    pub fn is_partial(&self) -> bool {
        self.queries.iter().any(|q| match &q.result {
            QueryResult::Failed(_) => true,
            QueryResult::Resolved(outcome) => !outcome.failed_downloads.is_empty(),
        })
    }

    /// Notification subject for this report.
    pub fn subject(&self) -> String {
        let base = match &self.outcome {
            RunOutcome::NoDocument => "Sin documentos",
            RunOutcome::NoNewInformation => "Sin nueva información",
            RunOutcome::Uploaded { .. } => "Información lista en Drive",
            RunOutcome::UploadFailed { .. } => "Problema subiendo a Drive",
        };
        if self.is_partial() {
            format!("{PARTIAL_PREFIX}{base}")
        } else {
            base.to_string()
        }
    }

    /// Notification body for this report.
    pub fn body(&self) -> String {
        let mut body = String::new();
        match &self.outcome {
            RunOutcome::NoDocument => {
                body.push_str("No se encontraron documentos en la carpeta.\n");
            }
            RunOutcome::NoNewInformation => {
                body.push_str("No hubo nueva información esta vez.\n");
            }
            RunOutcome::Uploaded { files } => {
                let _ = writeln!(
                    body,
                    "Se subieron {} videos a Google Drive:",
                    files.len()
                );
                for file in files {
                    let _ = writeln!(body, "  - {file}");
                }
            }
            RunOutcome::UploadFailed { error } => {
                let _ = writeln!(body, "Hubo un problema subiendo a Drive: {error}");
                let _ = writeln!(
                    body,
                    "Los videos descargados quedan en el directorio local."
                );
            }
        }

        if let Some(document) = &self.document {
            let _ = writeln!(body, "\nDocumento: {document}");
            let _ = writeln!(
                body,
                "Palabras clave: {} candidatas, {} consultadas",
                self.candidates.len(),
                self.filter.kept.len()
            );
        }

        for query in &self.queries {
            let line = match &query.result {
                QueryResult::Failed(error) => format!("error: {error}"),
                QueryResult::Resolved(outcome) => match outcome.search {
                    SearchOutcome::Exhausted { attempts } => {
                        format!("sin resultados tras {attempts} búsquedas")
                    }
                    SearchOutcome::Found { .. } => format!(
                        "{} nuevos, {} existentes, {} fallidos",
                        outcome.downloaded.len(),
                        outcome.skipped_existing.len(),
                        outcome.failed_downloads.len()
                    ),
                },
            };
            let _ = writeln!(body, "  {}: {line}", query.query);
        }

        let _ = write!(body, "\nEjecución {}", self.run_id);
        body
    }
}

/// Subject and body for a run that ended in an error.
pub fn failure_notification(
    run_id: &RunId,
    document: Option<&str>,
    error: &ReelMinerError,
) -> (String, String) {
    let mut body = format!("La ejecución falló: {error}\n");
    if let Some(document) = document {
        let _ = writeln!(body, "Documento: {document}");
    }
    let _ = write!(body, "\nEjecución {run_id}");
    ("Error en la ejecución".to_string(), body)
}
