//! Error types for the edgequake-studyguide library.
//!
//! Two distinct types reflect two distinct outcomes:
//!
//! * [`StudyGuideError`] — **Fatal** for the current request: the input was
//!   rejected, a document could not be read, the backend is not configured,
//!   the network failed, or the model answered with something that is not a
//!   study guide. Every variant is classified by [`ErrorKind`].
//!
//! * [`GuardWarning`] — **Non-fatal**: the request proceeds but the caller
//!   should be told (e.g. the input was truncated to the character limit).
//!
//! Callers that face end users should display [`StudyGuideError::user_message`]
//! and log the full `Display` form; the two differ for transport and
//! malformed-response failures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-studyguide library.
#[derive(Debug, Error)]
pub enum StudyGuideError {
    // ── Input validation ──────────────────────────────────────────────────
    /// Nothing to generate from: the text was empty or whitespace-only.
    #[error("Please enter or upload some study material first.")]
    EmptyInput,

    /// Text exceeds the dispatch limit.
    #[error("Input is too long: {chars} characters (maximum is {max}).")]
    InputTooLong { chars: usize, max: usize },

    /// Upload exceeds the ceiling for its document category.
    #[error("File '{filename}' is too large ({size} bytes). Maximum size for this file type is {limit_mib} MB.")]
    PayloadTooLarge {
        filename: String,
        size: usize,
        limit_mib: usize,
    },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    // ── Extraction ────────────────────────────────────────────────────────
    /// Format-specific decode/parse failure.
    #[error("Failed to extract text from .{extension} file: {detail}")]
    Extraction { extension: String, detail: String },

    /// The PDF engine cannot run in this environment.
    #[error("PDF extraction is not supported in this environment: {detail}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium or paste the text instead.")]
    EnvironmentUnsupported { detail: String },

    // ── Configuration ─────────────────────────────────────────────────────
    /// The provider's credential is missing.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    MissingCredential { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Transport ─────────────────────────────────────────────────────────
    /// The generation endpoint could not be reached or failed the exchange.
    #[error("Request to the generation endpoint failed: {message}")]
    Transport { message: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// A remote study-guide endpoint answered with a non-2xx status.
    #[error("Endpoint returned HTTP {status}: {message}")]
    RemoteRejected {
        status: u16,
        kind: Option<ErrorKind>,
        message: String,
    },

    // ── Response shape ────────────────────────────────────────────────────
    /// The model's answer could not be parsed as JSON.
    #[error("Model response is not valid JSON: {detail}")]
    MalformedResponse { detail: String },

    /// The model's answer parsed but has none of the expected fields.
    #[error("Model response has an invalid shape: {detail}")]
    InvalidShape { detail: String },

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not create or write an export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A saved plain-text study guide could not be read back.
    #[error("Not a study guide export: {detail}")]
    UnreadableExport { detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Classification of a [`StudyGuideError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad user input; recovered locally.
    Validation,
    /// A document could not be turned into text.
    Extraction,
    /// The server side is misconfigured (missing credential etc.).
    Configuration,
    /// Network failure reaching an endpoint.
    Transport,
    /// The model answered with something that is not a study guide.
    MalformedResponse,
    /// Local I/O or runtime failure.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl StudyGuideError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StudyGuideError::EmptyInput
            | StudyGuideError::InputTooLong { .. }
            | StudyGuideError::PayloadTooLarge { .. }
            | StudyGuideError::FileNotFound { .. }
            | StudyGuideError::PermissionDenied { .. }
            | StudyGuideError::InvalidInput { .. }
            | StudyGuideError::UnreadableExport { .. } => ErrorKind::Validation,

            StudyGuideError::Extraction { .. } | StudyGuideError::EnvironmentUnsupported { .. } => {
                ErrorKind::Extraction
            }

            StudyGuideError::MissingCredential { .. } | StudyGuideError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }

            StudyGuideError::Transport { .. }
            | StudyGuideError::DownloadFailed { .. }
            | StudyGuideError::DownloadTimeout { .. } => ErrorKind::Transport,

            StudyGuideError::RemoteRejected { status, kind, .. } => kind.unwrap_or({
                if (400..500).contains(status) {
                    ErrorKind::Validation
                } else {
                    ErrorKind::Transport
                }
            }),

            StudyGuideError::MalformedResponse { .. } | StudyGuideError::InvalidShape { .. } => {
                ErrorKind::MalformedResponse
            }

            StudyGuideError::OutputWriteFailed { .. } | StudyGuideError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// The message an end user should see.
    ///
    /// Transport and malformed-response failures collapse to generic
    /// messages; the detailed `Display` output belongs in logs.
    pub fn user_message(&self) -> String {
        match self {
            StudyGuideError::RemoteRejected { message, .. } => message.clone(),
            _ => match self.kind() {
                ErrorKind::Validation | ErrorKind::Extraction => self.to_string(),
                ErrorKind::Configuration => {
                    "Server configuration error: the study guide service is not set up correctly."
                        .to_string()
                }
                ErrorKind::Transport => {
                    "Network error. Please check your connection and try again.".to_string()
                }
                ErrorKind::MalformedResponse => {
                    "The study guide could not be generated. Please try again.".to_string()
                }
                ErrorKind::Internal => "Something went wrong. Please try again.".to_string(),
            },
        }
    }
}

/// A non-fatal condition attached to otherwise successful input preparation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GuardWarning {
    /// The text was cut to the character limit before dispatch.
    #[error("Input was truncated from {original_chars} to {kept_chars} characters.")]
    Truncated {
        original_chars: usize,
        kept_chars: usize,
    },
}
