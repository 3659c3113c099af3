//! Form submission module
//!
//! Decodes `multipart/form-data` bodies into a [`Submission`], extracts
//! validated field values from it and removes the spooled uploads again.

pub mod cleanup;
pub mod fields;
pub mod multipart;

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

pub use cleanup::remove_files;
pub use fields::{optional_field, require_field};
pub use multipart::{parse_multipart, ParseLimits};

/// Text values by field name, in arrival order per field
pub type FieldMap = BTreeMap<String, Vec<String>>;

/// Uploaded files by field name, in arrival order per field
pub type FileMap = BTreeMap<String, Vec<UploadedFile>>;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("request is not multipart/form-data")]
    NotMultipart,

    #[error(transparent)]
    Multipart(#[from] multer::Error),

    #[error("file in field `{field}` exceeds {limit} bytes")]
    FileTooLarge { field: String, limit: u64 },

    #[error("uploaded files exceed {limit} bytes in total")]
    TotalTooLarge { limit: u64 },

    #[error("text fields exceed {limit} bytes in total")]
    FieldsTooLarge { limit: u64 },

    #[error("no data received for {0:?}")]
    Stalled(std::time::Duration),

    #[error("failed to spool upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written to the upload directory while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the content was spooled
    pub path: PathBuf,
    /// Name the browser sent, if any
    pub original_filename: Option<String>,
    /// Declared content type of the part
    pub content_type: Option<String>,
    pub size: u64,
}

impl UploadedFile {
    /// Name to show for this file: the original name, or the spool file name
    pub fn display_name(&self) -> String {
        self.original_filename.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

/// A decoded form submission, scoped to one request.
///
/// Owns its spooled uploads: [`Submission::discard`] removes them, and
/// dropping a submission that still holds files removes them synchronously.
#[derive(Debug, Default)]
pub struct Submission {
    fields: FieldMap,
    files: FileMap,
}

impl Submission {
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    pub fn push_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.entry(name.into()).or_default().push(file);
    }

    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Files uploaded under one field name
    pub fn files_for(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every uploaded file, ordered by field name
    pub fn files(&self) -> impl Iterator<Item = &UploadedFile> {
        self.files.values().flatten()
    }

    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Remove every spooled upload concurrently and forget about them
    pub async fn discard(&mut self) {
        remove_files(self.files()).await;
        self.files.clear();
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        // Only reached with files left when the request future was cancelled
        for file in self.files.values().flatten() {
            cleanup::remove_file_now(&file.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, name: Option<&str>) -> UploadedFile {
        UploadedFile {
            path: PathBuf::from(path),
            original_filename: name.map(ToString::to_string),
            content_type: None,
            size: 1,
        }
    }

    #[test]
    fn test_fields_keep_arrival_order() {
        let mut submission = Submission::default();
        submission.push_field("name", "A");
        submission.push_field("name", "B");
        assert_eq!(submission.fields()["name"], vec!["A", "B"]);
    }

    #[test]
    fn test_files_grouped_by_field() {
        let mut submission = Submission::default();
        submission.push_file("upload", file("/formrelay-test/b", Some("license.pdf")));
        submission.push_file("abstractRecord", file("/formrelay-test/a", None));
        submission.push_file("upload", file("/formrelay-test/c", Some("back.png")));

        assert_eq!(submission.files_for("upload").len(), 2);
        assert!(submission.files_for("attachment").is_empty());
        assert_eq!(submission.file_count(), 3);

        let order: Vec<_> = submission.files().map(|f| f.path.clone()).collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("/formrelay-test/a"),
                PathBuf::from("/formrelay-test/b"),
                PathBuf::from("/formrelay-test/c")
            ]
        );
    }

    #[test]
    fn test_display_name_falls_back_to_spool_name() {
        assert_eq!(file("/formrelay-test/upload_1.pdf", Some("cv.pdf")).display_name(), "cv.pdf");
        assert_eq!(file("/formrelay-test/upload_1.pdf", None).display_name(), "upload_1.pdf");
    }

    fn spooled(dir: &std::path::Path, name: &str) -> UploadedFile {
        let path = dir.join(name);
        std::fs::write(&path, b"data").unwrap();
        UploadedFile {
            path,
            original_filename: None,
            content_type: None,
            size: 4,
        }
    }

    #[test]
    fn test_dropping_submission_removes_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let mut submission = Submission::default();
        submission.push_file("upload", spooled(dir.path(), "upload_1.png"));
        submission.push_file("abstractRecord", spooled(dir.path(), "upload_2.pdf"));

        drop(submission);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_discard_empties_submission() {
        let dir = tempfile::tempdir().unwrap();
        let mut submission = Submission::default();
        submission.push_file("attachment", spooled(dir.path(), "upload_1.txt"));

        submission.discard().await;

        assert_eq!(submission.file_count(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
