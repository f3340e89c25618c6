//! Progress-callback trait for generation stage events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as a request moves through extraction, guarding, dispatch and
//! parsing. The CLI renders these as a spinner; a server can forward them to
//! its logs.
//!
//! # Example
//!
//! ```rust
//! use edgequake_studyguide::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::Arc;
//!
//! struct Announce;
//!
//! impl GenerationProgressCallback for Announce {
//!     fn on_request_start(&self, input_chars: usize) {
//!         eprintln!("sending {input_chars} characters…");
//!     }
//! }
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(Arc::new(Announce) as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline at each stage boundary.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`; a callback
/// may be shared by concurrent requests.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called before a document is extracted.
    fn on_extract_start(&self, filename: &str, bytes: usize) {
        let _ = (filename, bytes);
    }

    /// Called after a document has been turned into text.
    fn on_extract_complete(&self, filename: &str, chars: usize) {
        let _ = (filename, chars);
    }

    /// Called when the text is cut to the character limit.
    fn on_truncated(&self, original_chars: usize, kept_chars: usize) {
        let _ = (original_chars, kept_chars);
    }

    /// Called just before the request is sent to the model.
    fn on_request_start(&self, input_chars: usize) {
        let _ = input_chars;
    }

    /// Called after a study guide has been parsed successfully.
    fn on_request_complete(&self, concepts: usize, questions: usize) {
        let _ = (concepts, questions);
    }

    /// Called when any stage fails.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
