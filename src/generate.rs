//! Top-level generation entry points.
//!
//! ```text
//! generate_from_input ──▶ resolve_upload ──┐
//! generate_from_upload ────────────────────┴─▶ extract_upload ──┐
//! generate ──────────────────────────────────────────────────────┴─▶ prepare_text ──▶ dispatch
//! ```
//!
//! Every path funnels through [`prepare_text`] (empty input blocked, long
//! input truncated) and then through [`crate::pipeline::llm::request_study_guide`],
//! which re-checks the payload before anything leaves the process. The backend
//! is resolved only after the text has passed the guard, so an empty form
//! never needs a credential.

use crate::config::GenerationConfig;
use crate::error::{GuardWarning, StudyGuideError};
use crate::output::GenerationOutput;
use crate::pipeline::guard::{self, GuardedText, TextGate};
use crate::pipeline::input::{self, RawUpload};
use crate::pipeline::llm::{self, ChatBackend, ProviderBackend};
use crate::pipeline::{extract, pdf::PdfEngine};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{debug, info};

/// Generate a study guide from text the user typed or pasted.
pub async fn generate(
    text: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput, StudyGuideError> {
    let guarded = prepare_text(text, config).inspect_err(|e| report_error(config, e))?;
    dispatch(guarded, config).await
}

/// Generate a study guide from an uploaded document.
pub async fn generate_from_upload(
    upload: &RawUpload,
    engine: &PdfEngine,
    config: &GenerationConfig,
) -> Result<GenerationOutput, StudyGuideError> {
    let text = extract_upload(upload, engine, config).await?;
    generate(&text, config).await
}

/// Generate a study guide from a local path or HTTP(S) URL.
pub async fn generate_from_input(
    input_str: impl AsRef<str>,
    engine: &PdfEngine,
    config: &GenerationConfig,
) -> Result<GenerationOutput, StudyGuideError> {
    let input_str = input_str.as_ref();
    info!("Starting generation: {}", input_str);
    let upload = input::resolve_upload(input_str, config.download_timeout_secs)
        .await
        .inspect_err(|e| report_error(config, e))?;
    generate_from_upload(&upload, engine, config).await
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    text: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput, StudyGuideError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StudyGuideError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(text, config))
}

/// Size-check and extract an upload, reporting progress.
///
/// Does not require an LLM provider or API key.
pub async fn extract_upload(
    upload: &RawUpload,
    engine: &PdfEngine,
    config: &GenerationConfig,
) -> Result<String, StudyGuideError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_extract_start(&upload.filename, upload.bytes.len());
    }

    let result = match guard::check_upload_size(upload) {
        Ok(()) => extract::extract_text(upload, engine).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(text) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_extract_complete(&upload.filename, text.chars().count());
            }
            Ok(text)
        }
        Err(e) => {
            report_error(config, &e);
            Err(e)
        }
    }
}

/// Apply the text policy; blank input becomes [`StudyGuideError::EmptyInput`].
pub fn prepare_text(raw: &str, config: &GenerationConfig) -> Result<GuardedText, StudyGuideError> {
    match guard::guard_text(raw, config.max_input_chars) {
        TextGate::Blocked => Err(StudyGuideError::EmptyInput),
        TextGate::Ready(guarded) => {
            if let (Some(GuardWarning::Truncated { original_chars, kept_chars }), Some(cb)) =
                (guarded.warning(), config.progress_callback.as_ref())
            {
                cb.on_truncated(*original_chars, *kept_chars);
            }
            Ok(guarded)
        }
    }
}

async fn dispatch(
    guarded: GuardedText,
    config: &GenerationConfig,
) -> Result<GenerationOutput, StudyGuideError> {
    let warnings: Vec<GuardWarning> = guarded.warning().cloned().into_iter().collect();

    let backend = resolve_backend(config).inspect_err(|e| report_error(config, e))?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(guarded.char_len());
    }

    let (result, stats) = llm::request_study_guide(backend.as_ref(), guarded.as_str(), config)
        .await
        .inspect_err(|e| report_error(config, e))?;

    info!(
        "Study guide ready: {} concepts, {} questions, {} attempt(s), {}ms",
        result.concepts.len(),
        result.questions.len(),
        stats.attempts,
        stats.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_complete(result.concepts.len(), result.questions.len());
    }

    Ok(GenerationOutput {
        result,
        warnings,
        stats,
    })
}

fn report_error(config: &GenerationConfig, e: &StudyGuideError) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_error(&e.to_string());
    }
}

// ── Backend resolution ─────────────────────────────────────────────────────

/// Resolve the chat backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`), created through
///    [`ProviderFactory::create_llm_provider`] once its credential is present.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    both set and non-empty.
/// 4. **OpenAI key present** (`OPENAI_API_KEY`): openai with the configured
///    or default model.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
///
/// Every failure here is a configuration error, raised before any request.
pub fn resolve_backend(config: &GenerationConfig) -> Result<Arc<dyn ChatBackend>, StudyGuideError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let env = |k: &str| std::env::var(k).ok();

    if let Some(ref name) = config.provider_name {
        return named_backend(name, config.model_or_default(), env);
    }

    if let (Some(prov), Some(model)) = (env("EDGEQUAKE_LLM_PROVIDER"), env("EDGEQUAKE_MODEL")) {
        if !prov.is_empty() && !model.is_empty() {
            return named_backend(&prov, &model, env);
        }
    }

    if env("OPENAI_API_KEY").is_some_and(|k| !k.is_empty()) {
        return named_backend("openai", config.model_or_default(), env);
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StudyGuideError::MissingCredential {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or GEMINI_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;
    debug!("Auto-detected LLM provider from environment");
    Ok(Arc::new(ProviderBackend::new(provider, "auto")))
}

fn named_backend(
    provider: &str,
    model: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn ChatBackend>, StudyGuideError> {
    check_credential(provider, env)?;
    let llm: Arc<dyn LLMProvider> = ProviderFactory::create_llm_provider(provider, model)
        .map_err(|e| StudyGuideError::MissingCredential {
            provider: provider.to_string(),
            hint: format!("{e}"),
        })?;
    debug!("Using LLM provider {}/{}", provider, model);
    Ok(Arc::new(ProviderBackend::new(llm, format!("{provider}/{model}"))))
}

/// Environment variable holding the credential for a provider.
///
/// `None` for providers that need no key, and for providers not listed here
/// (the provider factory reports those itself).
pub fn credential_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" | "claude" => Some("ANTHROPIC_API_KEY"),
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "azure" | "azure-openai" => Some("AZURE_OPENAI_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "xai" => Some("XAI_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

/// Fail with [`StudyGuideError::MissingCredential`] when the provider's key
/// variable is unset or empty.
pub fn check_credential(
    provider: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), StudyGuideError> {
    let Some(var) = credential_var(provider) else {
        return Ok(());
    };
    match env(var) {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(StudyGuideError::MissingCredential {
            provider: provider.to_string(),
            hint: format!("Set {var} in the environment."),
        }),
    }
}
