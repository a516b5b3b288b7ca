//! Zip archive of the stored videos that match the latest document's keywords.
//!
//! The archive is built in a throwaway work directory, uploaded next to the
//! videos it bundles, and the work directory is removed whatever happens.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use reelminer_shared::{ReelMinerError, RemoteStore, Result};
use reelminer_storage::KeywordHistory;

use crate::publish::reset_scratch_dir;

/// Where to search, how many matches per keyword, and where to stage files.
#[derive(Debug, Clone)]
pub struct ArchivePlan {
    pub videos_folder_id: String,
    pub work_dir: PathBuf,
    pub per_keyword: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// No document has been processed yet.
    NoHistory,
    /// None of the latest document's keywords matched a stored video.
    NoVideos { document: String },
    Uploaded {
        document: String,
        archive: String,
        remote_id: String,
        files: Vec<String>,
    },
}

/// Bundle the videos for the most recent history record into
/// `<document>.zip` and upload it to the videos folder.
///
/// Failed searches and downloads are logged and skipped. Zip and upload
/// errors are returned after the work directory has been removed.
#[instrument(skip_all, fields(folder_id = %plan.videos_folder_id))]
pub async fn build_archive<R: RemoteStore>(
    store: &R,
    history: &KeywordHistory,
    plan: &ArchivePlan,
) -> Result<ArchiveOutcome> {
    let Some(record) = history.latest() else {
        info!("history is empty, nothing to archive");
        return Ok(ArchiveOutcome::NoHistory);
    };
    let document = record.document.clone();
    let stem = safe_name(&document).ok_or_else(|| {
        ReelMinerError::validation(format!("document name {document:?} is not a usable file name"))
    })?;
    info!(document = %document, keywords = record.keywords.len(), "archiving latest document");

    reset_scratch_dir(&plan.work_dir)?;
    let doc_dir = plan.work_dir.join(&stem);
    std::fs::create_dir_all(&doc_dir).map_err(|e| ReelMinerError::io(&doc_dir, e))?;

    let mut fetched = Vec::new();
    let mut seen = HashSet::new();
    for keyword in &record.keywords {
        let found = match store
            .find_files(&plan.videos_folder_id, keyword.as_str(), plan.per_keyword)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "video search failed");
                continue;
            }
        };
        debug!(keyword = %keyword, found = found.len(), "searched");

        for file in found {
            let Some(name) = safe_name(&file.name) else {
                warn!(name = %file.name, "skipping unusable file name");
                continue;
            };
            if !seen.insert(name.clone()) {
                continue;
            }
            let dest = doc_dir.join(&name);
            match store.download_file(&file.id, &dest).await {
                Ok(()) => fetched.push(name),
                Err(e) => {
                    warn!(file = %name, error = %e, "download failed");
                    let _ = std::fs::remove_file(&dest);
                }
            }
        }
    }

    if fetched.is_empty() {
        info!(document = %document, "no videos downloaded, skipping archive");
        remove_work_dir(&plan.work_dir);
        return Ok(ArchiveOutcome::NoVideos { document });
    }

    let archive = format!("{stem}.zip");
    let zip_path = plan.work_dir.join(&archive);
    let uploaded = match zip_dir(&doc_dir, &zip_path) {
        Ok(()) => store.upload_file(&zip_path, &plan.videos_folder_id).await,
        Err(e) => Err(e),
    };
    remove_work_dir(&plan.work_dir);
    let remote_id = uploaded?;

    fetched.sort();
    info!(archive = %archive, files = fetched.len(), "archive uploaded");
    Ok(ArchiveOutcome::Uploaded {
        document,
        archive,
        remote_id,
        files: fetched,
    })
}

/// Compress the regular files in `dir` into a flat deflated zip at `dest`.
fn zip_dir(dir: &Path, dest: &Path) -> Result<()> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| ReelMinerError::io(dir, e))? {
        let path = entry.map_err(|e| ReelMinerError::io(dir, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let out = File::create(dest).map_err(|e| ReelMinerError::io(dest, e))?;
    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer
            .start_file(name, options)
            .map_err(|e| zip_error(dest, e))?;
        let mut input = File::open(path).map_err(|e| ReelMinerError::io(path, e))?;
        std::io::copy(&mut input, &mut writer).map_err(|e| ReelMinerError::io(dest, e))?;
    }
    writer.finish().map_err(|e| zip_error(dest, e))?;

    debug!(path = %dest.display(), entries = files.len(), "zip written");
    Ok(())
}

fn zip_error(path: &Path, e: zip::result::ZipError) -> ReelMinerError {
    ReelMinerError::Storage(format!("{}: {e}", path.display()))
}

fn remove_work_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        warn!(path = %dir.display(), error = %e, "could not remove work directory");
    }
}

/// A single path component derived from a remote or document name.
fn safe_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::io::{Cursor, Read};

    use reelminer_shared::{Keyword, RemoteFile, UploadSummary};
    use zip::ZipArchive;

    #[derive(Default)]
    struct FakeVideos {
        files: Vec<RemoteFile>,
        contents: HashMap<String, Vec<u8>>,
        broken: HashSet<String>,
        fail_upload: bool,
        searches: RefCell<Vec<(String, u32)>>,
        uploads: RefCell<Vec<(String, Vec<u8>)>>,
    }

    impl FakeVideos {
        fn with(mut self, id: &str, name: &str) -> Self {
            self.files.push(RemoteFile {
                id: id.into(),
                name: name.into(),
            });
            self.contents.insert(id.into(), format!("video {id}").into_bytes());
            self
        }
    }

    impl RemoteStore for FakeVideos {
        async fn list_filenames(&self, _folder_id: &str) -> Result<HashSet<String>> {
            unreachable!("archiving searches by name")
        }

        async fn upload_dir(&self, _local_dir: &Path, _folder_id: &str) -> Result<UploadSummary> {
            unreachable!("archiving uploads a single file")
        }

        async fn upload_file(&self, local_path: &Path, _folder_id: &str) -> Result<String> {
            let name = local_path.file_name().unwrap().to_string_lossy().into_owned();
            let bytes = std::fs::read(local_path).unwrap();
            self.uploads.borrow_mut().push((name, bytes));
            if self.fail_upload {
                return Err(ReelMinerError::Upload("quota exceeded".into()));
            }
            Ok("zip-1".into())
        }

        async fn find_files(
            &self,
            _folder_id: &str,
            fragment: &str,
            limit: u32,
        ) -> Result<Vec<RemoteFile>> {
            self.searches.borrow_mut().push((fragment.to_string(), limit));
            Ok(self
                .files
                .iter()
                .filter(|f| f.name.contains(fragment))
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()> {
            if self.broken.contains(file_id) {
                std::fs::write(dest, b"partial").unwrap();
                return Err(ReelMinerError::Network("connection reset".into()));
            }
            std::fs::write(dest, &self.contents[file_id]).unwrap();
            Ok(())
        }
    }

    fn kws(words: &[&str]) -> Vec<Keyword> {
        words.iter().filter_map(|w| Keyword::parse(w)).collect()
    }

    fn plan(dir: &Path, per_keyword: u32) -> ArchivePlan {
        ArchivePlan {
            videos_folder_id: "videos".into(),
            work_dir: dir.join("temp_archive"),
            per_keyword,
        }
    }

    fn zip_entries(bytes: &[u8]) -> Vec<(String, String)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entries = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            entries.push((entry.name().to_string(), body));
        }
        entries.sort();
        entries
    }

    #[tokio::test]
    async fn latest_document_videos_are_zipped_and_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeVideos::default()
            .with("a", "SOL_1080x1920_vertical_1.mp4")
            .with("b", "SOL_1920x1080_horizontal_2.mp4")
            .with("c", "SOL_720x1280_vertical_3.mp4")
            .with("d", "PLAYA_1080x1920_vertical_4.mp4");
        let mut history = KeywordHistory::new();
        history.record("Guion 1", kws(&["LUNA"]));
        history.record("Guion 2", kws(&["SOL", "PLAYA"]));

        let outcome = build_archive(&store, &history, &plan(dir.path(), 2)).await.unwrap();

        assert_eq!(
            outcome,
            ArchiveOutcome::Uploaded {
                document: "Guion 2".into(),
                archive: "Guion 2.zip".into(),
                remote_id: "zip-1".into(),
                files: vec![
                    "PLAYA_1080x1920_vertical_4.mp4".into(),
                    "SOL_1080x1920_vertical_1.mp4".into(),
                    "SOL_1920x1080_horizontal_2.mp4".into(),
                ],
            }
        );
        assert_eq!(
            *store.searches.borrow(),
            vec![("SOL".to_string(), 2), ("PLAYA".to_string(), 2)]
        );

        let uploads = store.uploads.borrow();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "Guion 2.zip");
        assert_eq!(
            zip_entries(&uploads[0].1),
            vec![
                ("PLAYA_1080x1920_vertical_4.mp4".to_string(), "video d".to_string()),
                ("SOL_1080x1920_vertical_1.mp4".to_string(), "video a".to_string()),
                ("SOL_1920x1080_horizontal_2.mp4".to_string(), "video b".to_string()),
            ]
        );
        assert!(!dir.path().join("temp_archive").exists());
    }

    #[tokio::test]
    async fn videos_matching_several_keywords_are_archived_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeVideos::default().with("a", "SOLAR_1080x1920_vertical_1.mp4");
        let mut history = KeywordHistory::new();
        history.record("Guion", kws(&["SOL", "SOLAR"]));

        let outcome = build_archive(&store, &history, &plan(dir.path(), 4)).await.unwrap();

        let ArchiveOutcome::Uploaded { files, .. } = outcome else {
            panic!("expected an upload, got {outcome:?}");
        };
        assert_eq!(files, vec!["SOLAR_1080x1920_vertical_1.mp4".to_string()]);
        assert_eq!(zip_entries(&store.uploads.borrow()[0].1).len(), 1);
    }

    #[tokio::test]
    async fn empty_history_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeVideos::default();

        let outcome = build_archive(&store, &KeywordHistory::new(), &plan(dir.path(), 4))
            .await
            .unwrap();

        assert_eq!(outcome, ArchiveOutcome::NoHistory);
        assert!(store.searches.borrow().is_empty());
        assert!(!dir.path().join("temp_archive").exists());
    }

    #[tokio::test]
    async fn no_matches_skips_the_upload_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("temp_archive");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(work.join("stale.zip"), b"old").unwrap();
        let store = FakeVideos::default().with("a", "PLAYA_1080x1920_vertical_1.mp4");
        let mut history = KeywordHistory::new();
        history.record("Guion", kws(&["MONTAÑA"]));

        let outcome = build_archive(&store, &history, &plan(dir.path(), 4)).await.unwrap();

        assert_eq!(
            outcome,
            ArchiveOutcome::NoVideos {
                document: "Guion".into()
            }
        );
        assert!(store.uploads.borrow().is_empty());
        assert!(!work.exists());
    }

    #[tokio::test]
    async fn failed_downloads_are_left_out_of_the_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FakeVideos::default()
            .with("a", "SOL_1080x1920_vertical_1.mp4")
            .with("b", "SOL_1920x1080_horizontal_2.mp4");
        store.broken.insert("a".into());
        let mut history = KeywordHistory::new();
        history.record("Guion", kws(&["SOL"]));

        let outcome = build_archive(&store, &history, &plan(dir.path(), 4)).await.unwrap();

        let ArchiveOutcome::Uploaded { files, .. } = outcome else {
            panic!("expected an upload, got {outcome:?}");
        };
        assert_eq!(files, vec!["SOL_1920x1080_horizontal_2.mp4".to_string()]);
        let entries = zip_entries(&store.uploads.borrow()[0].1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "SOL_1920x1080_horizontal_2.mp4");
    }

    #[tokio::test]
    async fn upload_failure_is_returned_after_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FakeVideos::default().with("a", "SOL_1080x1920_vertical_1.mp4");
        store.fail_upload = true;
        let mut history = KeywordHistory::new();
        history.record("Guion", kws(&["SOL"]));

        let err = build_archive(&store, &history, &plan(dir.path(), 4)).await.unwrap_err();

        assert!(matches!(err, ReelMinerError::Upload(_)));
        assert!(!dir.path().join("temp_archive").exists());
    }

    #[test]
    fn names_are_reduced_to_one_path_component() {
        assert_eq!(safe_name("Guion 3").as_deref(), Some("Guion 3"));
        assert_eq!(safe_name("a/b\\c").as_deref(), Some("a_b_c"));
        assert_eq!(safe_name(" .. "), None);
        assert_eq!(safe_name(""), None);
    }
}
