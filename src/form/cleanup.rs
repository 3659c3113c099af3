//! Removal of spooled uploads
//!
//! Best-effort: every file is removed concurrently and failures are only logged.

use futures_util::future::join_all;
use std::io::ErrorKind;
use std::path::Path;

use super::UploadedFile;

/// Delete the given uploads, waiting for every removal to finish
pub async fn remove_files<'a, I>(files: I)
where
    I: IntoIterator<Item = &'a UploadedFile>,
{
    let removals = files.into_iter().map(|file| async move {
        match tokio::fs::remove_file(&file.path).await {
            Ok(()) => tracing::trace!(path = %file.path.display(), "removed upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %file.path.display(), "upload already gone");
            }
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "failed to remove upload");
            }
        }
    });

    join_all(removals).await;
}

/// Blocking removal for contexts that cannot await, such as `Drop`
pub fn remove_file_now(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed abandoned upload"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove upload"),
    }
}
