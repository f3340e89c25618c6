//! Input resolution: turn a user-supplied path or URL into a [`RawUpload`].
//!
//! Everything downstream works on bytes plus a filename, which is exactly
//! what a browser upload or a multipart form hands over. Local files and
//! downloads are normalised into that shape here, and the upload ceiling is
//! checked as early as the size is known so oversized files are never read
//! into memory in full.

use crate::error::StudyGuideError;
use crate::pipeline::extract::DocumentKind;
use crate::pipeline::guard::{check_upload_size, upload_limit};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An uploaded document: opaque bytes plus the name they arrived under.
///
/// Lives only for the duration of one extraction call.
#[derive(Clone)]
pub struct RawUpload {
    /// Declared filename; its extension drives extraction.
    pub filename: String,
    /// File content.
    pub bytes: Vec<u8>,
    /// MIME type reported by the transport, if any. Informational only.
    pub mime_hint: Option<String>,
}

impl std::fmt::Debug for RawUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawUpload")
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .field("mime_hint", &self.mime_hint)
            .finish()
    }
}

impl RawUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            mime_hint: None,
        }
    }

    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }

    /// Extraction strategy implied by the filename.
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_filename(&self.filename)
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an upload.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_upload(input: &str, timeout_secs: u64) -> Result<RawUpload, StudyGuideError> {
    if input.trim().is_empty() {
        return Err(StudyGuideError::InvalidInput {
            input: input.to_string(),
        });
    }
    let upload = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    check_upload_size(&upload)?;
    Ok(upload)
}

/// Read a local file, rejecting it by size before reading the content.
async fn read_local(path_str: &str) -> Result<RawUpload, StudyGuideError> {
    let path = PathBuf::from(path_str);

    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) => m,
        Err(e) => return Err(map_io_error(e, path)),
    };
    if !meta.is_file() {
        return Err(StudyGuideError::InvalidInput {
            input: path_str.to_string(),
        });
    }

    let filename = file_name_of(&path);
    let limit = upload_limit(&DocumentKind::from_filename(&filename));
    if meta.len() > limit as u64 {
        return Err(StudyGuideError::PayloadTooLarge {
            filename,
            size: meta.len() as usize,
            limit_mib: limit / (1024 * 1024),
        });
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| map_io_error(e, path.clone()))?;

    debug!("Read local file {} ({} bytes)", path.display(), bytes.len());
    Ok(RawUpload::new(filename, bytes))
}

fn map_io_error(e: std::io::Error, path: PathBuf) -> StudyGuideError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => StudyGuideError::PermissionDenied { path },
        std::io::ErrorKind::NotFound => StudyGuideError::FileNotFound { path },
        _ => StudyGuideError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<RawUpload, StudyGuideError> {
    info!("Downloading study material from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StudyGuideError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            StudyGuideError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            StudyGuideError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(StudyGuideError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);
    let limit = upload_limit(&DocumentKind::from_filename(&filename));
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(StudyGuideError::PayloadTooLarge {
                filename,
                size: len as usize,
                limit_mib: limit / (1024 * 1024),
            });
        }
    }

    let mime_hint = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| StudyGuideError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} ({} bytes)", filename, bytes.len());

    let mut upload = RawUpload::new(filename, bytes.to_vec());
    upload.mime_hint = mime_hint;
    Ok(upload)
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.txt".to_string()
}
