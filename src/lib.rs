//! # edgequake-studyguide
//!
//! Turn study material (pasted text, Markdown, PDF or Word documents) into a
//! structured study guide: a short summary, a detailed summary, key
//! concept/definition pairs and practice questions. Generation is delegated
//! to an LLM through `edgequake-llm`; this crate owns everything around the
//! call.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document / text
//!  │
//!  ├─ 1. Input     resolve a local file or download from URL
//!  ├─ 2. Extract   pdf (pdfium) · docx (docx-rs) · text (UTF-8)
//!  ├─ 3. Guard     upload ceilings, empty input blocked, 10 000-char cap
//!  ├─ 4. Request   one prompt, one response (temperature 0.4, 700 tokens)
//!  ├─ 5. Parse     slice the JSON, strict decode, fill defaults
//!  └─ 6. Export    plain text · printable HTML · JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_studyguide::{generate, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = GenerationConfig::default();
//!     let output = generate("Mitochondria produce ATP through respiration.", &config).await?;
//!     println!("{}", edgequake_studyguide::to_plain_text(&output.result));
//!     Ok(())
//! }
//! ```
//!
//! Documents go through a [`PdfEngine`] created once and shared:
//!
//! ```rust,no_run
//! use edgequake_studyguide::{generate_from_input, GenerationConfig, PdfEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = PdfEngine::new();
//! let output = generate_from_input("lecture.pdf", &engine, &GenerationConfig::default()).await?;
//! for w in &output.warnings {
//!     eprintln!("warning: {w}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`    | on  | Enables the `studyguide` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | off | Enables [`server`] and the `studyguide-server` binary (axum + tower-http) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod remote;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder};
pub use error::{ErrorKind, GuardWarning, StudyGuideError};
pub use export::{from_plain_text, to_html, to_plain_text, write_atomic, write_export, ExportFormat};
pub use generate::{
    extract_upload, generate, generate_from_input, generate_from_upload, generate_sync,
    prepare_text, resolve_backend,
};
pub use output::{Concept, GenerationOutput, GenerationResult, GenerationStats};
pub use pipeline::extract::DocumentKind;
pub use pipeline::input::RawUpload;
pub use pipeline::llm::{ChatBackend, ProviderBackend};
pub use pipeline::pdf::PdfEngine;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use remote::RemoteClient;
