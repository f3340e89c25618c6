//! Content guard: size and length limits between the user and the model.
//!
//! Three checks, all against the same thresholds:
//!
//! 1. [`check_upload_size`] — before extraction, reject files above the
//!    ceiling for their category (10 MiB for PDF/Word, 5 MiB otherwise).
//! 2. [`guard_text`] — after extraction or direct entry, block empty input
//!    and truncate anything longer than [`MAX_INPUT_CHARS`] with a warning.
//! 3. [`ensure_dispatchable`] — immediately before a request leaves the
//!    process, reject empty or over-long payloads again. This re-check does
//!    not trust that (2) ran; the server path reaches it with raw JSON input.
//!
//! Lengths are counted in Unicode scalar values (`char`s), never bytes.

use crate::error::{GuardWarning, StudyGuideError};
use crate::pipeline::extract::DocumentKind;
use crate::pipeline::input::RawUpload;
use tracing::{debug, warn};

/// Maximum characters sent to the model.
pub const MAX_INPUT_CHARS: usize = 10_000;

/// Upload ceiling for PDF and Word documents.
pub const DOCUMENT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

/// Upload ceiling for every other file.
pub const TEXT_UPLOAD_LIMIT: usize = 5 * 1024 * 1024;

/// Upload ceiling in bytes for a document category.
pub fn upload_limit(kind: &DocumentKind) -> usize {
    match kind {
        DocumentKind::Pdf | DocumentKind::Word => DOCUMENT_UPLOAD_LIMIT,
        DocumentKind::PlainText | DocumentKind::Unknown(_) => TEXT_UPLOAD_LIMIT,
    }
}

/// Reject an upload that exceeds the ceiling for its category.
///
/// Must be called before extraction is attempted.
pub fn check_upload_size(upload: &RawUpload) -> Result<(), StudyGuideError> {
    let kind = DocumentKind::from_filename(&upload.filename);
    let limit = upload_limit(&kind);
    if upload.bytes.len() > limit {
        warn!(
            "Rejecting '{}': {} bytes exceeds the {} byte ceiling",
            upload.filename,
            upload.bytes.len(),
            limit
        );
        return Err(StudyGuideError::PayloadTooLarge {
            filename: upload.filename.clone(),
            size: upload.bytes.len(),
            limit_mib: limit / (1024 * 1024),
        });
    }
    Ok(())
}

/// Text that passed the guard and may be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedText {
    text: String,
    warning: Option<GuardWarning>,
}

impl GuardedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Set when the input was truncated.
    pub fn warning(&self) -> Option<&GuardWarning> {
        self.warning.as_ref()
    }
}

/// Outcome of [`guard_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextGate {
    /// No usable input; a request must not be dispatched. Not an error.
    Blocked,
    /// Input is ready, possibly truncated.
    Ready(GuardedText),
}

impl TextGate {
    pub fn is_blocked(&self) -> bool {
        matches!(self, TextGate::Blocked)
    }
}

/// Apply the text length policy.
///
/// Empty or whitespace-only input yields [`TextGate::Blocked`]. Input longer
/// than `max_chars` is cut to exactly its first `max_chars` characters and
/// carries a [`GuardWarning::Truncated`].
pub fn guard_text(raw: impl Into<String>, max_chars: usize) -> TextGate {
    let mut text = raw.into();
    if text.trim().is_empty() {
        debug!("Guard: input is blank, blocking dispatch");
        return TextGate::Blocked;
    }

    let original_chars = text.chars().count();
    let mut warning = None;
    if original_chars > max_chars {
        let cut = byte_offset_of_char(&text, max_chars);
        text.truncate(cut);
        warn!(
            "Guard: truncated input from {} to {} characters",
            original_chars, max_chars
        );
        warning = Some(GuardWarning::Truncated {
            original_chars,
            kept_chars: max_chars,
        });
        if text.trim().is_empty() {
            return TextGate::Blocked;
        }
    }

    TextGate::Ready(GuardedText { text, warning })
}

/// Dispatch-time re-check.
pub fn ensure_dispatchable(text: &str, max_chars: usize) -> Result<(), StudyGuideError> {
    if text.trim().is_empty() {
        return Err(StudyGuideError::EmptyInput);
    }
    let chars = text.chars().count();
    if chars > max_chars {
        return Err(StudyGuideError::InputTooLong {
            chars,
            max: max_chars,
        });
    }
    Ok(())
}

/// Byte offset of the `n`-th character, or the string length.
fn byte_offset_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, len: usize) -> RawUpload {
        RawUpload::new(name, vec![b'a'; len])
    }

    #[test]
    fn pdf_and_word_get_ten_mib() {
        assert!(check_upload_size(&upload("a.pdf", DOCUMENT_UPLOAD_LIMIT)).is_ok());
        assert!(check_upload_size(&upload("a.docx", DOCUMENT_UPLOAD_LIMIT)).is_ok());
        let err = check_upload_size(&upload("a.DOC", DOCUMENT_UPLOAD_LIMIT + 1)).unwrap_err();
        assert!(err.to_string().contains("10 MB"), "got: {err}");
    }

    #[test]
    fn other_files_get_five_mib() {
        assert!(check_upload_size(&upload("a.md", TEXT_UPLOAD_LIMIT)).is_ok());
        let err = check_upload_size(&upload("a.txt", TEXT_UPLOAD_LIMIT + 1)).unwrap_err();
        assert!(err.to_string().contains("5 MB"), "got: {err}");
        let err = check_upload_size(&upload("data.csv", TEXT_UPLOAD_LIMIT + 1)).unwrap_err();
        assert!(matches!(err, StudyGuideError::PayloadTooLarge { limit_mib: 5, .. }));
    }

    #[test]
    fn blank_input_is_blocked() {
        assert!(guard_text("", MAX_INPUT_CHARS).is_blocked());
        assert!(guard_text("  \n\t ", MAX_INPUT_CHARS).is_blocked());
    }

    #[test]
    fn short_input_passes_unchanged() {
        match guard_text("Photosynthesis", MAX_INPUT_CHARS) {
            TextGate::Ready(t) => {
                assert_eq!(t.as_str(), "Photosynthesis");
                assert!(t.warning().is_none());
            }
            TextGate::Blocked => panic!("should not block"),
        }
    }

    #[test]
    fn long_input_truncates_to_exact_prefix() {
        let input: String = "abcdefghij".repeat(1_200);
        match guard_text(input.clone(), MAX_INPUT_CHARS) {
            TextGate::Ready(t) => {
                assert_eq!(t.char_len(), MAX_INPUT_CHARS);
                assert_eq!(t.as_str(), &input[..MAX_INPUT_CHARS]);
                assert_eq!(
                    t.warning(),
                    Some(&GuardWarning::Truncated {
                        original_chars: 12_000,
                        kept_chars: MAX_INPUT_CHARS,
                    })
                );
            }
            TextGate::Blocked => panic!("should not block"),
        }
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let input: String = "é".repeat(10_005);
        match guard_text(input, MAX_INPUT_CHARS) {
            TextGate::Ready(t) => {
                assert_eq!(t.char_len(), MAX_INPUT_CHARS);
                assert_eq!(t.as_str().len(), MAX_INPUT_CHARS * 2);
            }
            TextGate::Blocked => panic!("should not block"),
        }
    }

    #[test]
    fn exactly_at_limit_is_not_truncated() {
        let input = "x".repeat(MAX_INPUT_CHARS);
        match guard_text(input, MAX_INPUT_CHARS) {
            TextGate::Ready(t) => assert!(t.warning().is_none()),
            TextGate::Blocked => panic!("should not block"),
        }
    }

    #[test]
    fn dispatch_recheck_rejects_empty_and_long() {
        assert!(matches!(
            ensure_dispatchable("   ", MAX_INPUT_CHARS),
            Err(StudyGuideError::EmptyInput)
        ));
        let long = "y".repeat(MAX_INPUT_CHARS + 1);
        assert!(matches!(
            ensure_dispatchable(&long, MAX_INPUT_CHARS),
            Err(StudyGuideError::InputTooLong { chars: 10_001, max: 10_000 })
        ));
        assert!(ensure_dispatchable("ok", MAX_INPUT_CHARS).is_ok());
    }
}
