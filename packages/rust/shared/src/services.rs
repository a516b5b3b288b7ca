//! Seams between the run logic and the outside world.
//!
//! Each trait has one production implementation in its own crate
//! (`reelminer-drive`, `reelminer-catalog`, `reelminer-notify`) and
//! in-memory fakes in tests. Runs are strictly sequential, so the returned
//! futures carry no `Send` bound.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;

use crate::error::Result;
use crate::types::{CatalogVideo, DownloadedAsset, RemoteFile, SourceDocument, UploadSummary};

/// Where the keyword document comes from.
pub trait DocumentSource {
    /// Fetch the most recently modified document in `folder_id` as plain text.
    /// Returns `None` when the folder holds no document.
    fn latest_document(&self, folder_id: &str) -> impl Future<Output = Result<Option<SourceDocument>>>;
}

/// Remote folder storage for finished videos.
pub trait RemoteStore {
    /// Full listing of file names currently in `folder_id`.
    fn list_filenames(&self, folder_id: &str) -> impl Future<Output = Result<HashSet<String>>>;

    /// Upload every regular file in `local_dir` into `folder_id`.
    fn upload_dir(
        &self,
        local_dir: &Path,
        folder_id: &str,
    ) -> impl Future<Output = Result<UploadSummary>>;

    /// Upload one local file into `folder_id`. Returns the remote file id.
    fn upload_file(&self, local_path: &Path, folder_id: &str) -> impl Future<Output = Result<String>>;

    /// Up to `limit` files in `folder_id` whose name contains `fragment`.
    fn find_files(
        &self,
        folder_id: &str,
        fragment: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<RemoteFile>>>;

    /// Download the content of `file_id` into `dest`.
    fn download_file(&self, file_id: &str, dest: &Path) -> impl Future<Output = Result<()>>;
}

/// Paged stock-video search plus raw downloads.
pub trait VideoCatalog {
    /// One page of search results.
    fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<CatalogVideo>>>;

    /// Fetch the bytes behind a rendition link. A non-2xx status is returned
    /// in [`DownloadedAsset::status`], not as an error.
    fn download(&self, url: &str) -> impl Future<Output = Result<DownloadedAsset>>;
}

/// Best-effort outbound notification. Never fails: implementations log and
/// swallow delivery errors.
pub trait Notifier {
    fn notify(&self, subject: &str, body: &str) -> impl Future<Output = ()>;
}

// ---------------------------------------------------------------------------
// Borrowed implementations
// ---------------------------------------------------------------------------

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn latest_document(&self, folder_id: &str) -> impl Future<Output = Result<Option<SourceDocument>>> {
        (**self).latest_document(folder_id)
    }
}

impl<T: RemoteStore + ?Sized> RemoteStore for &T {
    fn list_filenames(&self, folder_id: &str) -> impl Future<Output = Result<HashSet<String>>> {
        (**self).list_filenames(folder_id)
    }

    fn upload_dir(
        &self,
        local_dir: &Path,
        folder_id: &str,
    ) -> impl Future<Output = Result<UploadSummary>> {
        (**self).upload_dir(local_dir, folder_id)
    }

    fn upload_file(&self, local_path: &Path, folder_id: &str) -> impl Future<Output = Result<String>> {
        (**self).upload_file(local_path, folder_id)
    }

    fn find_files(
        &self,
        folder_id: &str,
        fragment: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<RemoteFile>>> {
        (**self).find_files(folder_id, fragment, limit)
    }

    fn download_file(&self, file_id: &str, dest: &Path) -> impl Future<Output = Result<()>> {
        (**self).download_file(file_id, dest)
    }
}

impl<T: VideoCatalog + ?Sized> VideoCatalog for &T {
    fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<CatalogVideo>>> {
        (**self).search(query, page, page_size)
    }

    fn download(&self, url: &str) -> impl Future<Output = Result<DownloadedAsset>> {
        (**self).download(url)
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, subject: &str, body: &str) -> impl Future<Output = ()> {
        (**self).notify(subject, body)
    }
}
