//! Multipart body parser
//!
//! Streams a request body through `multer`. Text parts become field values,
//! parts carrying a filename are spooled to the upload directory. The caller
//! owns the spooled files once parsing succeeds; on failure the parser removes
//! whatever it already wrote.

use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_TYPE};
use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{FormError, Submission, UploadedFile};
use crate::config::Config;

/// Ceiling for all text fields of one submission together: 20 MiB
pub const DEFAULT_MAX_FIELDS_SIZE: u64 = 20 * 1024 * 1024;

/// Size ceilings and spool location applied while parsing
#[derive(Debug, Clone)]
pub struct ParseLimits {
    pub max_file_size: u64,
    pub max_total_file_size: u64,
    pub max_fields_size: u64,
    pub upload_dir: PathBuf,
    /// Longest wait for the next piece of body data
    pub read_timeout: Duration,
}

impl ParseLimits {
    pub fn from_config(config: &Config) -> Self {
        let forms = &config.forms;
        Self {
            max_file_size: forms.max_file_size,
            max_total_file_size: forms.max_total_file_size(),
            max_fields_size: DEFAULT_MAX_FIELDS_SIZE,
            upload_dir: forms.upload_dir(),
            read_timeout: Duration::from_secs(config.performance.read_timeout),
        }
    }
}

/// Running byte counts for one submission
#[derive(Default)]
struct Budget {
    files: u64,
    fields: u64,
}

/// Parse a `multipart/form-data` body into a [`Submission`]
pub async fn parse_multipart<B>(
    headers: &HeaderMap,
    body: B,
    limits: &ParseLimits,
) -> Result<Submission, FormError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or(FormError::NotMultipart)?;
    let boundary = multer::parse_boundary(content_type)?;
    let mut multipart = multer::Multipart::new(body.into_data_stream(), boundary);

    let mut submission = Submission::default();
    match read_parts(&mut multipart, &mut submission, limits).await {
        Ok(()) => Ok(submission),
        Err(e) => {
            submission.discard().await;
            Err(e)
        }
    }
}

/// Await one read from the body, failing once it stalls past `read_timeout`
async fn idle_read<T, F>(limits: &ParseLimits, read: F) -> Result<T, FormError>
where
    F: Future<Output = Result<T, multer::Error>>,
{
    match tokio::time::timeout(limits.read_timeout, read).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(FormError::Stalled(limits.read_timeout)),
    }
}

async fn read_parts(
    multipart: &mut multer::Multipart<'_>,
    submission: &mut Submission,
    limits: &ParseLimits,
) -> Result<(), FormError> {
    let mut budget = Budget::default();

    while let Some(mut field) = idle_read(limits, multipart.next_field()).await? {
        let Some(name) = field.name().map(ToString::to_string) else {
            tracing::debug!("skipping unnamed multipart part");
            continue;
        };

        match field.file_name().map(ToString::to_string) {
            None => {
                let value = read_text(&mut field, limits, &mut budget).await?;
                submission.push_field(name, value);
            }
            Some(file_name) => {
                if let Some(file) =
                    spool_file(&mut field, &name, file_name, limits, &mut budget).await?
                {
                    submission.push_file(name, file);
                }
            }
        }
    }

    Ok(())
}

async fn read_text(
    field: &mut multer::Field<'_>,
    limits: &ParseLimits,
    budget: &mut Budget,
) -> Result<String, FormError> {
    let mut buf = Vec::new();
    while let Some(chunk) = idle_read(limits, field.chunk()).await? {
        budget.fields += chunk.len() as u64;
        if budget.fields > limits.max_fields_size {
            return Err(FormError::FieldsTooLarge {
                limit: limits.max_fields_size,
            });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write one file part to disk.
///
/// Returns `None` for the empty, nameless part a browser sends for an
/// untouched file input.
async fn spool_file(
    field: &mut multer::Field<'_>,
    name: &str,
    file_name: String,
    limits: &ParseLimits,
    budget: &mut Budget,
) -> Result<Option<UploadedFile>, FormError> {
    let content_type = field.content_type().map(ToString::to_string);
    let path = limits.upload_dir.join(spool_name(&file_name));

    let size = match write_field(field, &path, name, limits, budget).await {
        Ok(size) => size,
        Err(e) => {
            discard(&path).await;
            return Err(e);
        }
    };

    if size == 0 && file_name.is_empty() {
        discard(&path).await;
        return Ok(None);
    }

    tracing::debug!(field = name, size, path = %path.display(), "spooled upload");
    Ok(Some(UploadedFile {
        path,
        original_filename: Some(file_name).filter(|n| !n.is_empty()),
        content_type,
        size,
    }))
}

async fn write_field(
    field: &mut multer::Field<'_>,
    path: &Path,
    name: &str,
    limits: &ParseLimits,
    budget: &mut Budget,
) -> Result<u64, FormError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut size: u64 = 0;

    while let Some(chunk) = idle_read(limits, field.chunk()).await? {
        size += chunk.len() as u64;
        budget.files += chunk.len() as u64;
        if size > limits.max_file_size {
            return Err(FormError::FileTooLarge {
                field: name.to_string(),
                limit: limits.max_file_size,
            });
        }
        if budget.files > limits.max_total_file_size {
            return Err(FormError::TotalTooLarge {
                limit: limits.max_total_file_size,
            });
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(size)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), error = %e, "could not discard partial upload");
    }
}

/// Random spool file name keeping the original extension
fn spool_name(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(OsStr::to_str)
        .filter(|ext| ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    format!("upload_{}{extension}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use http_body_util::Full;
    use hyper::header::HeaderValue;

    const BOUNDARY: &str = "X-FORMRELAY-BOUNDARY";

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={BOUNDARY}")).unwrap(),
        );
        headers
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(data);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn body(parts: Vec<Vec<u8>>) -> Full<Bytes> {
        let mut raw: Vec<u8> = parts.into_iter().flatten().collect();
        raw.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Full::new(Bytes::from(raw))
    }

    fn limits(dir: &Path) -> ParseLimits {
        ParseLimits {
            max_file_size: 1024,
            max_total_file_size: 1536,
            max_fields_size: 256,
            upload_dir: dir.to_path_buf(),
            read_timeout: Duration::from_secs(5),
        }
    }

    fn spooled_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_fields_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let body = body(vec![
            text_part("name", "Jane Doe").into_bytes(),
            text_part("name", "John Doe").into_bytes(),
            file_part("attachment", "quote.pdf", "application/pdf", b"%PDF-1.4"),
        ]);

        let submission = parse_multipart(&headers(), body, &limits(dir.path()))
            .await
            .unwrap();

        assert_eq!(submission.fields()["name"], vec!["Jane Doe", "John Doe"]);
        let files = submission.files_for("attachment");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].original_filename.as_deref(), Some("quote.pdf"));
        assert_eq!(files[0].content_type.as_deref(), Some("application/pdf"));
        assert_eq!(files[0].size, 8);
        assert_eq!(files[0].path.extension().unwrap(), "pdf");
        assert_eq!(std::fs::read(&files[0].path).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let body = body(vec![
            file_part("attachment", "small.txt", "text/plain", b"ok"),
            file_part("attachment", "big.bin", "application/octet-stream", &[7u8; 2048]),
        ]);

        let err = parse_multipart(&headers(), body, &limits(dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, FormError::FileTooLarge { limit: 1024, .. }));
        assert_eq!(spooled_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_file_of_exactly_max_size_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let body = body(vec![file_part(
            "attachment",
            "exact.bin",
            "application/octet-stream",
            &[3u8; 1024],
        )]);

        let submission = parse_multipart(&headers(), body, &limits(dir.path()))
            .await
            .unwrap();

        assert_eq!(submission.files_for("attachment")[0].size, 1024);
        assert_eq!(spooled_count(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_file_one_byte_over_max_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = body(vec![file_part(
            "attachment",
            "over.bin",
            "application/octet-stream",
            &[3u8; 1025],
        )]);

        let err = parse_multipart(&headers(), body, &limits(dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, FormError::FileTooLarge { limit: 1024, .. }));
        assert_eq!(spooled_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_stalled_body_fails_and_removes_partial_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut limits = limits(dir.path());
        limits.read_timeout = Duration::from_millis(100);

        let head = file_part("attachment", "slow.txt", "text/plain", b"first half");
        let frames = futures_util::stream::iter([Ok::<_, std::convert::Infallible>(
            hyper::body::Frame::data(Bytes::from(head)),
        )])
        .chain(futures_util::stream::pending());
        let body = http_body_util::StreamBody::new(frames);

        let err = parse_multipart(&headers(), body, &limits).await.unwrap_err();

        assert!(matches!(err, FormError::Stalled(_)));
        assert_eq!(spooled_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_total_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let body = body(vec![
            file_part("upload", "a.png", "image/png", &[1u8; 1000]),
            file_part("abstractRecord", "b.png", "image/png", &[2u8; 1000]),
        ]);

        let err = parse_multipart(&headers(), body, &limits(dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, FormError::TotalTooLarge { .. }));
        assert_eq!(spooled_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_text_fields_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let long = "x".repeat(300);
        let body = body(vec![text_part("message", &long).into_bytes()]);

        let err = parse_multipart(&headers(), body, &limits(dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, FormError::FieldsTooLarge { limit: 256 }));
    }

    #[tokio::test]
    async fn test_untouched_file_input_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let body = body(vec![
            text_part("name", "Jane").into_bytes(),
            file_part("attachment", "", "application/octet-stream", b""),
        ]);

        let submission = parse_multipart(&headers(), body, &limits(dir.path()))
            .await
            .unwrap();

        assert_eq!(submission.file_count(), 0);
        assert_eq!(spooled_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let err = parse_multipart(&headers, Full::new(Bytes::from("{}")), &limits(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::Multipart(_)));

        let err = parse_multipart(&HeaderMap::new(), Full::new(Bytes::new()), &limits(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::NotMultipart));
    }

    #[tokio::test]
    async fn test_truncated_body() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = file_part("attachment", "cut.txt", "text/plain", b"partial");
        raw.truncate(raw.len() - 4);

        let err = parse_multipart(&headers(), Full::new(Bytes::from(raw)), &limits(dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, FormError::Multipart(_)));
        assert_eq!(spooled_count(dir.path()), 0);
    }

    #[test]
    fn test_spool_name_keeps_extension() {
        assert!(spool_name("license.PDF").ends_with(".PDF"));
        assert!(spool_name("photo.jpeg").starts_with("upload_"));
        assert!(!spool_name("noext").contains('.'));
        assert!(!spool_name("evil.p/h").contains('/'));
        assert!(!spool_name("weird.ex t").contains(' '));
    }
}
