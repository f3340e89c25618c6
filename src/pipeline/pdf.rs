//! PDF text extraction through pdfium.
//!
//! [`PdfEngine`] is the one shared resource in the pipeline. Construct it once
//! at startup and hand `&PdfEngine` (or an `Arc`) to every extraction call.
//! The first call resolves and loads the pdfium shared library; concurrent
//! first callers wait on the same [`OnceLock`] and every later call reuses the
//! stored outcome without locking.
//!
//! ## Library location
//!
//! First match wins:
//!
//! 1. an explicit path given to [`PdfEngine::with_library_path`]
//! 2. `PDFIUM_LIB_PATH`
//! 3. `<cache dir>/edgequake-studyguide/pdfium/<platform library name>`
//! 4. the system library search path
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state; parsing happens on the
//! blocking pool so Tokio worker threads never stall on a large document.

use crate::error::StudyGuideError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Where the pdfium library was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLibrary {
    /// A specific shared-library file.
    Path(PathBuf),
    /// Whatever the dynamic loader finds on the system search path.
    System,
}

/// pdfium-backed page text extractor.
#[derive(Debug)]
pub struct PdfEngine {
    explicit: Option<PathBuf>,
    resolved: OnceLock<Result<EngineLibrary, String>>,
}

impl Default for PdfEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfEngine {
    /// Engine that locates pdfium through the environment and cache directory.
    pub fn new() -> Self {
        Self {
            explicit: None,
            resolved: OnceLock::new(),
        }
    }

    /// Engine bound to a specific pdfium shared library.
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
            resolved: OnceLock::new(),
        }
    }

    /// Well-known cache location of the pdfium library for this platform.
    pub fn cache_library_path() -> PathBuf {
        let base = dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir);
        base.join("edgequake-studyguide")
            .join("pdfium")
            .join(Pdfium::pdfium_platform_library_name())
    }

    /// Resolve and load the library. Idempotent; only the first call does work.
    pub fn initialise(&self) -> Result<&EngineLibrary, StudyGuideError> {
        self.resolved
            .get_or_init(|| {
                let library = locate_library(self.explicit.as_deref());
                info!("Initialising PDF engine from {:?}", library);
                match bind(&library) {
                    Ok(_) => Ok(library),
                    Err(e) => {
                        warn!("PDF engine unavailable: {}", e);
                        Err(e)
                    }
                }
            })
            .as_ref()
            .map_err(|detail| StudyGuideError::EnvironmentUnsupported {
                detail: detail.clone(),
            })
    }

    /// `true` once [`PdfEngine::initialise`] has run, successfully or not.
    pub fn is_initialised(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Extract the text of every page, in order.
    ///
    /// Text runs within a page are joined with single spaces; pages are
    /// separated by a blank line.
    pub async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, StudyGuideError> {
        let library = self.initialise()?.clone();

        tokio::task::spawn_blocking(move || extract_text_blocking(&library, &bytes))
            .await
            .map_err(|e| StudyGuideError::Internal(format!("PDF extraction task panicked: {}", e)))?
    }
}

fn locate_library(explicit: Option<&Path>) -> EngineLibrary {
    if let Some(p) = explicit {
        return EngineLibrary::Path(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        let p = PathBuf::from(p);
        if p.exists() {
            return EngineLibrary::Path(p);
        }
        warn!("PDFIUM_LIB_PATH '{}' not found; trying other locations", p.display());
    }
    let cached = PdfEngine::cache_library_path();
    if cached.exists() {
        return EngineLibrary::Path(cached);
    }
    EngineLibrary::System
}

fn bind(library: &EngineLibrary) -> Result<Pdfium, String> {
    let bindings = match library {
        EngineLibrary::Path(p) => Pdfium::bind_to_library(p),
        EngineLibrary::System => Pdfium::bind_to_system_library(),
    };
    bindings.map(Pdfium::new).map_err(|e| format!("{:?}", e))
}

/// Blocking implementation of page text extraction.
fn extract_text_blocking(library: &EngineLibrary, bytes: &[u8]) -> Result<String, StudyGuideError> {
    let pdfium =
        bind(library).map_err(|detail| StudyGuideError::EnvironmentUnsupported { detail })?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| StudyGuideError::Extraction {
            extension: "pdf".into(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut raw = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let page_text = page.text().map_err(|e| StudyGuideError::Extraction {
            extension: "pdf".into(),
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        raw.push(page_text.all());
    }

    Ok(assemble_pages(raw))
}

/// Normalise each page and join them in document order.
///
/// Whitespace inside a page collapses to single spaces; pages are separated
/// by a blank line. Empty pages keep their slot.
pub(crate) fn assemble_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .enumerate()
        .map(|(idx, page)| {
            let text = normalise_page_text(page.as_ref());
            debug!("Page {} → {} chars", idx + 1, text.chars().count());
            text
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Collapse all whitespace inside a page to single spaces.
pub(crate) fn normalise_page_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_runs_collapse_to_single_spaces() {
        assert_eq!(
            normalise_page_text("Intro\n  text.\r\n\tMore   words "),
            "Intro text. More words"
        );
        assert_eq!(normalise_page_text("   \n"), "");
    }

    #[test]
    fn three_pages_are_joined_in_order() {
        let raw = vec![
            "Intro text.\r\n".to_string(),
            "  Middle\n text. ".to_string(),
            "Conclusion text.".to_string(),
        ];
        assert_eq!(
            assemble_pages(raw),
            "Intro text.\n\nMiddle text.\n\nConclusion text."
        );
    }

    #[test]
    fn empty_pages_keep_their_slot() {
        assert_eq!(assemble_pages(["One", " \n", "Three"]), "One\n\n\n\nThree");
        assert_eq!(assemble_pages(Vec::<String>::new()), "");
    }

    #[test]
    fn explicit_path_wins() {
        let lib = locate_library(Some(Path::new("/opt/pdfium/libpdfium.so")));
        assert_eq!(lib, EngineLibrary::Path(PathBuf::from("/opt/pdfium/libpdfium.so")));
    }

    #[test]
    fn cache_path_is_deterministic() {
        let a = PdfEngine::cache_library_path();
        let b = PdfEngine::cache_library_path();
        assert_eq!(a, b);
        assert!(a.to_string_lossy().contains("edgequake-studyguide"));
    }

    #[test]
    fn missing_library_is_environment_unsupported_and_cached() {
        let engine = PdfEngine::with_library_path("/definitely/not/libpdfium.so");
        assert!(!engine.is_initialised());

        let first = engine.initialise().unwrap_err();
        assert!(matches!(first, StudyGuideError::EnvironmentUnsupported { .. }));
        assert!(engine.is_initialised());

        let second = engine.initialise().unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn concurrent_first_use_initialises_once() {
        let engine =
            std::sync::Arc::new(PdfEngine::with_library_path("/definitely/not/libpdfium.so"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let e = std::sync::Arc::clone(&engine);
                std::thread::spawn(move || {
                    e.initialise().map(|l| l.clone()).map_err(|e| e.to_string())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }
}
