//! Scratch directory handling and the upload step.

use std::path::Path;

use tracing::{info, instrument, warn};

use reelminer_shared::{ReelMinerError, RemoteStore, Result};

use crate::report::RunOutcome;

/// Empty `dir`, creating it if needed, so a run only uploads its own downloads.
pub fn reset_scratch_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| ReelMinerError::io(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| ReelMinerError::io(dir, e))
}

/// Upload the scratch directory when the run found something new.
///
/// Upload errors become [`RunOutcome::UploadFailed`]; they never fail the run.
#[instrument(skip_all, fields(folder_id = %folder_id, new_info = has_new_info))]
pub async fn publish<R: RemoteStore>(
    store: &R,
    scratch_dir: &Path,
    folder_id: &str,
    has_new_info: bool,
) -> RunOutcome {
    if !has_new_info {
        info!("no new information, skipping upload");
        return RunOutcome::NoNewInformation;
    }

    match store.upload_dir(scratch_dir, folder_id).await {
        Ok(summary) => {
            info!(files = summary.uploaded.len(), "published");
            RunOutcome::Uploaded {
                files: summary.uploaded,
            }
        }
        Err(e) => {
            warn!(error = %e, "upload failed");
            RunOutcome::UploadFailed {
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelminer_shared::{RemoteFile, UploadSummary};
    use std::cell::Cell;
    use std::collections::HashSet;

    struct Store {
        fail: bool,
        calls: Cell<usize>,
    }

    impl RemoteStore for Store {
        async fn list_filenames(&self, _folder_id: &str) -> Result<HashSet<String>> {
            Ok(HashSet::new())
        }

        async fn upload_dir(&self, _local_dir: &Path, _folder_id: &str) -> Result<UploadSummary> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(ReelMinerError::Upload("1 of 1 files failed".into()))
            } else {
                Ok(UploadSummary {
                    uploaded: vec!["a.mp4".into()],
                })
            }
        }

        async fn upload_file(&self, _local_path: &Path, _folder_id: &str) -> Result<String> {
            unreachable!("publish uploads whole directories")
        }

        async fn find_files(
            &self,
            _folder_id: &str,
            _fragment: &str,
            _limit: u32,
        ) -> Result<Vec<RemoteFile>> {
            Ok(Vec::new())
        }

        async fn download_file(&self, _file_id: &str, _dest: &Path) -> Result<()> {
            unreachable!("publish never downloads")
        }
    }

    #[test]
    fn reset_removes_leftovers() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("temp_videos");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("old.mp4"), b"x").unwrap();

        reset_scratch_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn nothing_new_skips_upload() {
        let store = Store { fail: false, calls: Cell::new(0) };
        let outcome = publish(&store, Path::new("unused"), "videos", false).await;
        assert_eq!(outcome, RunOutcome::NoNewInformation);
        assert_eq!(store.calls.get(), 0);
    }

    #[tokio::test]
    async fn upload_error_is_an_outcome() {
        let store = Store { fail: true, calls: Cell::new(0) };
        let outcome = publish(&store, Path::new("unused"), "videos", true).await;
        assert!(matches!(outcome, RunOutcome::UploadFailed { ref error } if error.contains("1 of 1")));

        let store = Store { fail: false, calls: Cell::new(0) };
        let outcome = publish(&store, Path::new("unused"), "videos", true).await;
        assert_eq!(outcome, RunOutcome::Uploaded { files: vec!["a.mp4".into()] });
    }
}
