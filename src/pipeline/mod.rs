//! Pipeline stages for study-guide generation.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ guard ──▶ llm ──▶ parse
//! (path/URL) (pdf/docx/txt) (limits) (model) (JSON → result)
//! ```
//!
//! 1. [`input`]   — turn a path or URL into a [`input::RawUpload`]; local
//!    files over their ceiling are refused before they are read
//! 2. [`extract`] — pick a strategy from the extension and produce plain
//!    text; PDFs go through the shared [`pdf::PdfEngine`]
//! 3. [`guard`]   — upload ceilings before extraction; afterwards block
//!    empty input and truncate to the character limit
//! 4. [`llm`]     — build the prompt and run the single exchange; the only
//!    stage with model I/O
//! 5. [`parse`]   — slice, decode and normalise the model's JSON answer

pub mod extract;
pub mod guard;
pub mod input;
pub mod llm;
pub mod parse;
pub mod pdf;
