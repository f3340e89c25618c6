//! Document extraction: turn a [`RawUpload`] into plain text.
//!
//! Dispatch is by lower-cased filename extension:
//!
//! | Extension | Strategy |
//! |-----------|----------|
//! | `pdf` | [`PdfEngine`] page text, pages separated by a blank line |
//! | `docx`, `doc` | docx-rs document tree, one blank line between paragraphs |
//! | `txt`, `md`, `text` | UTF-8 decode, verbatim |
//! | anything else | UTF-8 decode, best effort |
//!
//! A failure inside a strategy becomes [`StudyGuideError::Extraction`] naming
//! the extension. There is no cross-strategy fallback: a PDF that fails to
//! parse is not retried as text.

use crate::error::StudyGuideError;
use crate::pipeline::input::RawUpload;
use crate::pipeline::pdf::PdfEngine;
use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};
use tracing::{debug, info};

/// Extensions offered to file pickers.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["txt", "md", "text", "pdf", "docx", "doc"];

/// Extraction strategy selected from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// `.docx` and `.doc`.
    Word,
    /// `.txt`, `.md`, `.text`.
    PlainText,
    /// Anything else, holding the lower-cased extension (may be empty).
    Unknown(String),
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Self {
        let ext = extension_of(filename);
        match ext.as_str() {
            "pdf" => DocumentKind::Pdf,
            "docx" | "doc" => DocumentKind::Word,
            "txt" | "md" | "text" => DocumentKind::PlainText,
            _ => DocumentKind::Unknown(ext),
        }
    }

    /// Whether the extension is in [`ACCEPTED_EXTENSIONS`].
    pub fn is_accepted(&self) -> bool {
        !matches!(self, DocumentKind::Unknown(_))
    }
}

/// Lower-cased extension after the last `.`, or an empty string.
pub fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Extract plain text from an upload.
pub async fn extract_text(
    upload: &RawUpload,
    engine: &PdfEngine,
) -> Result<String, StudyGuideError> {
    let kind = upload.kind();
    debug!("Extracting '{}' as {:?}", upload.filename, kind);

    let text = match kind {
        DocumentKind::Pdf => engine.extract_text(upload.bytes.clone()).await?,
        DocumentKind::Word => {
            let ext = extension_of(&upload.filename);
            extract_word(&upload.bytes).map_err(|detail| StudyGuideError::Extraction {
                extension: ext,
                detail,
            })?
        }
        DocumentKind::PlainText | DocumentKind::Unknown(_) => decode_utf8(&upload.bytes),
    };

    info!(
        "Extracted {} chars from '{}' ({} bytes)",
        text.chars().count(),
        upload.filename,
        upload.bytes.len()
    );
    Ok(text)
}

/// Decode bytes as UTF-8; invalid sequences become U+FFFD.
pub fn decode_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ── Word documents ──────────────────────────────────────────────────────────
//
// Paragraph → Run → Text through the docx-rs tree. Tabs and line breaks
// inside a run are kept; empty paragraphs, tables and drawings are dropped.

fn extract_word(bytes: &[u8]) -> Result<String, String> {
    let docx = read_docx(bytes).map_err(|e| format!("not a readable Word package: {:?}", e))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    debug!("Word document: {} paragraphs with text", paragraphs.len());
    Ok(paragraphs.join("\n\n"))
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}
