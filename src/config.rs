//! Configuration types for study-guide generation.
//!
//! All generation behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. The backend itself is resolved at
//! request time (see [`crate::generate::resolve_backend`]), so a config can be
//! built before any credential is present in the environment.

use crate::error::StudyGuideError;
use crate::pipeline::guard::MAX_INPUT_CHARS;
use crate::pipeline::llm::ChatBackend;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Upper bound for [`GenerationConfig::repair_attempts`].
pub const MAX_REPAIR_ATTEMPTS: u32 = 2;

/// Configuration for a study-guide generation request.
///
/// # Example
/// ```rust
/// use edgequake_studyguide::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .model("gpt-4.1-mini")
///     .temperature(0.3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// LLM model identifier, e.g. "gpt-4.1-nano". If None, [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `backend`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn ChatBackend>>,

    /// Sampling temperature. Default: 0.4.
    ///
    /// Low enough to keep the JSON shape stable, high enough that questions
    /// are not word-for-word restatements of the summary.
    pub temperature: f32,

    /// Maximum output tokens. Default: 700.
    pub max_tokens: usize,

    /// Character limit enforced at dispatch. Default: [`MAX_INPUT_CHARS`].
    pub max_input_chars: usize,

    /// Follow-up requests allowed when the answer does not parse. Default: 0.
    ///
    /// With the default a generation is exactly one request/response
    /// exchange and a malformed answer is returned to the caller as
    /// [`StudyGuideError::MalformedResponse`].
    pub repair_attempts: u32,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Stage events for progress displays.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            backend: None,
            temperature: 0.4,
            max_tokens: 700,
            max_input_chars: MAX_INPUT_CHARS,
            repair_attempts: 0,
            system_prompt: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn ChatBackend>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_input_chars", &self.max_input_chars)
            .field("repair_attempts", &self.repair_attempts)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model identifier that will be requested.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl fmt::Debug for GenerationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn repair_attempts(mut self, n: u32) -> Self {
        self.config.repair_attempts = n.min(MAX_REPAIR_ATTEMPTS);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, StudyGuideError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(StudyGuideError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_input_chars == 0 || c.max_input_chars > MAX_INPUT_CHARS {
            return Err(StudyGuideError::InvalidConfig(format!(
                "max_input_chars must be 1–{}, got {}",
                MAX_INPUT_CHARS, c.max_input_chars
            )));
        }
        if let Some(ref m) = c.model {
            if m.trim().is_empty() {
                return Err(StudyGuideError::InvalidConfig(
                    "model identifier must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_generation_contract() {
        let c = GenerationConfig::default();
        assert!((c.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(c.max_tokens, 700);
        assert_eq!(c.max_input_chars, 10_000);
        assert_eq!(c.repair_attempts, 0);
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
    }

    #[test]
    fn builder_clamps_values() {
        let c = GenerationConfig::builder()
            .temperature(5.0)
            .repair_attempts(9)
            .build()
            .unwrap();
        assert!((c.temperature - 2.0).abs() < f32::EPSILON);
        assert_eq!(c.repair_attempts, MAX_REPAIR_ATTEMPTS);
    }

    #[test]
    fn builder_rejects_limit_above_dispatch_ceiling() {
        let err = GenerationConfig::builder()
            .max_input_chars(20_000)
            .build()
            .unwrap_err();
        assert!(matches!(err, StudyGuideError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_blank_model() {
        let err = GenerationConfig::builder().model("  ").build().unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn debug_does_not_expose_backend() {
        let s = format!("{:?}", GenerationConfig::default());
        assert!(s.contains("GenerationConfig"));
        assert!(s.contains("temperature"));
    }
}
