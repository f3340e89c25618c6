//! Export formatter: study guide → plain text, printable HTML or JSON.
//!
//! Rendering is pure string work. [`write_export`] adds the one file-system
//! operation, an atomic write (temp file + rename) so an interrupted save
//! never leaves a half-written guide behind.
//!
//! The plain-text layout is stable and [`from_plain_text`] reads it back,
//! which lets a saved guide be reloaded without the model:
//!
//! ```text
//! SUMMARY
//! Cells are the unit of life.
//!
//! KEY CONCEPTS
//! 1. Mitochondria
//!    Produces ATP.
//!
//! PRACTICE QUESTIONS
//! 1. What is ATP?
//!
//! DETAILED SUMMARY
//! No detailed summary.
//! ```
//!
//! Item bodies are indented by three spaces. A multi-line concept term
//! continues on `   | ` lines before its definition. Free-text lines that
//! match a heading or placeholder get a leading `\` so they stay body text;
//! definition lines starting with `|` or `\` are escaped the same way.

use crate::error::StudyGuideError;
use crate::output::{Concept, GenerationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::info;

pub const SUMMARY_HEADING: &str = "SUMMARY";
pub const CONCEPTS_HEADING: &str = "KEY CONCEPTS";
pub const QUESTIONS_HEADING: &str = "PRACTICE QUESTIONS";
pub const DETAILED_HEADING: &str = "DETAILED SUMMARY";

pub const NO_CONCEPTS: &str = "No concepts.";
pub const NO_QUESTIONS: &str = "No questions.";
pub const NO_DETAILED_SUMMARY: &str = "No detailed summary.";

/// Title of the printable document.
pub const DOCUMENT_TITLE: &str = "Study Guide";

const INDENT: &str = "   ";

const TERM_CONTINUATION: &str = "| ";

const ESCAPE: char = '\\';

static RE_NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\. ?(.*)$").expect("valid numbered-item regex"));

/// Output format for a saved guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    Html,
    Json,
}

impl ExportFormat {
    /// File name used when the caller gives none.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ExportFormat::Text => "study-guide.txt",
            ExportFormat::Html => "study-guide.html",
            ExportFormat::Json => "study-guide.json",
        }
    }

    pub fn render(&self, result: &GenerationResult) -> Result<String, StudyGuideError> {
        match self {
            ExportFormat::Text => Ok(to_plain_text(result)),
            ExportFormat::Html => Ok(to_html(result)),
            ExportFormat::Json => serde_json::to_string_pretty(result)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| StudyGuideError::Internal(format!("JSON export failed: {e}"))),
        }
    }
}

/// Render the four sections in fixed order.
pub fn to_plain_text(result: &GenerationResult) -> String {
    let mut out = String::new();

    out.push_str(SUMMARY_HEADING);
    out.push('\n');
    push_free_text(&mut out, &result.summary);
    out.push('\n');

    out.push_str(CONCEPTS_HEADING);
    out.push('\n');
    if result.concepts.is_empty() {
        out.push_str(NO_CONCEPTS);
        out.push('\n');
    }
    for (i, c) in result.concepts.iter().enumerate() {
        let mut term = c.term.split('\n');
        out.push_str(&format!("{}. {}\n", i + 1, term.next().unwrap_or("")));
        for line in term {
            out.push_str(&format!("{INDENT}{TERM_CONTINUATION}{line}\n"));
        }
        if !c.def.is_empty() {
            for line in c.def.split('\n') {
                let escaped = line.starts_with(ESCAPE) || line.starts_with('|');
                out.push_str(INDENT);
                if escaped {
                    out.push(ESCAPE);
                }
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out.push('\n');

    out.push_str(QUESTIONS_HEADING);
    out.push('\n');
    if result.questions.is_empty() {
        out.push_str(NO_QUESTIONS);
        out.push('\n');
    }
    for (i, q) in result.questions.iter().enumerate() {
        let mut lines = q.split('\n');
        out.push_str(&format!("{}. {}\n", i + 1, lines.next().unwrap_or("")));
        for rest in lines {
            out.push_str(INDENT);
            out.push_str(rest);
            out.push('\n');
        }
    }
    out.push('\n');

    out.push_str(DETAILED_HEADING);
    out.push('\n');
    if result.detailed_summary.is_empty() {
        out.push_str(NO_DETAILED_SUMMARY);
        out.push('\n');
    } else {
        push_free_text(&mut out, &result.detailed_summary);
    }

    out
}

/// Write `text` line by line, escaping lines the reader would take as layout.
fn push_free_text(out: &mut String, text: &str) {
    for line in text.split('\n') {
        if line.starts_with(ESCAPE) || is_reserved(line) {
            out.push(ESCAPE);
        }
        out.push_str(line);
        out.push('\n');
    }
}

fn is_reserved(line: &str) -> bool {
    matches!(
        line.trim_end(),
        SUMMARY_HEADING
            | CONCEPTS_HEADING
            | QUESTIONS_HEADING
            | DETAILED_HEADING
            | NO_CONCEPTS
            | NO_QUESTIONS
            | NO_DETAILED_SUMMARY
    )
}

fn unescape(line: &str) -> &str {
    line.strip_prefix(ESCAPE).unwrap_or(line)
}

/// Printable HTML: the plain-text rendering, markup-escaped, in a minimal page.
pub fn to_html(result: &GenerationResult) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>body{{font-family:sans-serif;margin:2em}}pre{{white-space:pre-wrap;font-family:inherit}}</style>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <pre>{body}</pre>\n\
         </body>\n\
         </html>\n",
        title = DOCUMENT_TITLE,
        body = escape_markup(&to_plain_text(result)),
    )
}

/// Escape `<` and `>`. Nothing else is touched.
pub fn escape_markup(s: &str) -> String {
    s.replace('<', "&lt;").replace('>', "&gt;")
}

// ── Reading a saved guide ───────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Summary,
    Concepts,
    Questions,
    Detailed,
}

/// Read a guide written by [`to_plain_text`].
///
/// Headings are matched in order, so heading-like lines inside a later
/// section's body are kept as body text.
pub fn from_plain_text(text: &str) -> Result<GenerationResult, StudyGuideError> {
    let mut section = Section::Preamble;
    let mut summary: Vec<&str> = Vec::new();
    let mut concept_lines: Vec<&str> = Vec::new();
    let mut question_lines: Vec<&str> = Vec::new();
    let mut detailed: Vec<&str> = Vec::new();

    for line in text.lines() {
        let heading = line.trim_end();
        section = match (section, heading) {
            (Section::Preamble, SUMMARY_HEADING) => Section::Summary,
            (Section::Summary, CONCEPTS_HEADING) => Section::Concepts,
            (Section::Concepts, QUESTIONS_HEADING) => Section::Questions,
            (Section::Questions, DETAILED_HEADING) => Section::Detailed,
            (current, _) => {
                match current {
                    Section::Preamble => {}
                    Section::Summary => summary.push(line),
                    Section::Concepts => concept_lines.push(line),
                    Section::Questions => question_lines.push(line),
                    Section::Detailed => detailed.push(line),
                }
                continue;
            }
        };
    }

    if section != Section::Detailed {
        let missing = match section {
            Section::Preamble => SUMMARY_HEADING,
            Section::Summary => CONCEPTS_HEADING,
            Section::Concepts => QUESTIONS_HEADING,
            _ => DETAILED_HEADING,
        };
        return Err(StudyGuideError::UnreadableExport {
            detail: format!("missing '{missing}' section"),
        });
    }

    // The summary is followed by one separator line before the next heading.
    if summary.last().is_some_and(|l| l.is_empty()) {
        summary.pop();
    }
    let detailed_summary = if detailed.len() == 1 && detailed[0] == NO_DETAILED_SUMMARY {
        String::new()
    } else {
        free_text(&detailed)
    };

    let concepts = numbered_items(&concept_lines, NO_CONCEPTS)?
        .into_iter()
        .map(|(head, body)| concept_from(head, body))
        .collect();
    let questions = numbered_items(&question_lines, NO_QUESTIONS)?
        .into_iter()
        .map(|(first, rest)| {
            std::iter::once(first)
                .chain(rest)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();

    Ok(GenerationResult {
        summary: free_text(&summary),
        detailed_summary,
        concepts,
        questions,
    })
}

fn free_text(lines: &[&str]) -> String {
    lines.iter().map(|l| unescape(l)).collect::<Vec<_>>().join("\n")
}

/// Split an item body into term continuation lines and definition lines.
fn concept_from(head: String, body: Vec<String>) -> Concept {
    let mut term = vec![head];
    let mut def: Vec<&str> = Vec::new();
    for line in &body {
        match line.strip_prefix(TERM_CONTINUATION) {
            Some(rest) if def.is_empty() => term.push(rest.to_string()),
            _ => def.push(unescape(line)),
        }
    }
    Concept {
        term: term.join("\n"),
        def: def.join("\n"),
    }
}

/// Parse `N. head` lines, each followed by indented continuation lines.
///
/// Indented lines are taken before blank lines are skipped, so a blank line
/// inside an item survives as an indent-only line.
fn numbered_items(
    lines: &[&str],
    placeholder: &str,
) -> Result<Vec<(String, Vec<String>)>, StudyGuideError> {
    let mut items: Vec<(String, Vec<String>)> = Vec::new();
    for line in lines {
        if let Some(rest) = line.strip_prefix(INDENT) {
            match items.last_mut() {
                Some((_, body)) => body.push(rest.to_string()),
                None => {
                    return Err(StudyGuideError::UnreadableExport {
                        detail: format!("indented line before any item: '{}'", line.trim()),
                    })
                }
            }
        } else if line.trim().is_empty() || line.trim() == placeholder {
            continue;
        } else if let Some(caps) = RE_NUMBERED.captures(line) {
            items.push((caps[2].to_string(), Vec::new()));
        } else {
            return Err(StudyGuideError::UnreadableExport {
                detail: format!("expected a numbered item, found '{}'", line.trim()),
            });
        }
    }
    Ok(items)
}

/// Render `result` and write it to `path` atomically.
pub async fn write_export(
    result: &GenerationResult,
    format: ExportFormat,
    path: impl AsRef<Path>,
) -> Result<(), StudyGuideError> {
    let content = format.render(result)?;
    write_atomic(path, &content).await
}

/// Write `content` to a `.tmp` sibling of `path`, then rename it into place.
///
/// Missing parent directories are created.
pub async fn write_atomic(path: impl AsRef<Path>, content: &str) -> Result<(), StudyGuideError> {
    let path = path.as_ref();
    let write_failed = |e: std::io::Error| StudyGuideError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, content).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;

    info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
