//! Output types: the normalized study guide and per-request statistics.

use crate::error::GuardWarning;
use serde::{Deserialize, Serialize};

/// A key concept and its definition, in generation order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Concept {
    pub term: String,
    pub def: String,
}

impl Concept {
    pub fn new(term: impl Into<String>, def: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            def: def.into(),
        }
    }
}

/// The normalized four-field study guide.
///
/// Every field is always present; missing fields in the model answer become
/// empty strings or empty lists. Concepts and questions keep the order the
/// model produced them in and are not deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationResult {
    pub summary: String,
    pub detailed_summary: String,
    pub concepts: Vec<Concept>,
    pub questions: Vec<String>,
}

impl GenerationResult {
    /// `true` when the model produced nothing displayable.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.detailed_summary.is_empty()
            && self.concepts.is_empty()
            && self.questions.is_empty()
    }
}

/// Bookkeeping for one generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Characters of input text actually sent.
    pub input_chars: usize,
    /// Prompt tokens reported by the provider (summed over attempts).
    pub input_tokens: usize,
    /// Completion tokens reported by the provider (summed over attempts).
    pub output_tokens: usize,
    /// Wall-clock time of the exchange(s).
    pub duration_ms: u64,
    /// Number of request/response exchanges performed (1 unless repair is on).
    pub attempts: u32,
}

/// A successful generation: the guide plus what happened along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub result: GenerationResult,
    /// Non-fatal conditions, e.g. truncated input.
    #[serde(default)]
    pub warnings: Vec<GuardWarning>,
    pub stats: GenerationStats,
}
