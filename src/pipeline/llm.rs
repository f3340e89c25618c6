//! Generation request: build the prompt and run the exchange with the model.
//!
//! Prompt wording lives in [`crate::prompts`]; this module owns the request
//! shape, the dispatch-time re-check, and the call itself. A generation is a
//! single request/response exchange: no streaming, no multi-turn context, no
//! automatic retry on transport errors. The only follow-up request is the
//! opt-in repair attempt ([`GenerationConfig::repair_attempts`]) when the
//! answer does not parse.
//!
//! The model sits behind [`ChatBackend`] so tests and alternative transports
//! can replace it; [`ProviderBackend`] adapts any `edgequake_llm` provider.

use crate::config::GenerationConfig;
use crate::error::StudyGuideError;
use crate::output::{GenerationResult, GenerationStats};
use crate::pipeline::{guard, parse};
use crate::prompts::{build_repair_prompt, build_user_prompt, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One prompt: a system instruction plus the user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: usize,
}

/// What came back from the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Anything that can answer a [`Prompt`].
///
/// Errors are plain strings: every backend failure is a transport-class
/// failure from the caller's point of view.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> String;

    async fn complete(
        &self,
        prompt: &Prompt,
        params: CompletionParams,
    ) -> Result<BackendReply, String>;
}

/// [`ChatBackend`] over an `edgequake_llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    /// `label` names the provider/model pair in logs, e.g. `"openai/gpt-4.1-nano"`.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for ProviderBackend {
    fn name(&self) -> String {
        self.label.clone()
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        params: CompletionParams,
    ) -> Result<BackendReply, String> {
        let messages = vec![
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];
        let options = CompletionOptions {
            temperature: Some(params.temperature),
            max_tokens: Some(params.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| format!("{}", e))?;

        Ok(BackendReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

/// Build the prompt for `text`.
pub fn build_prompt(text: &str, config: &GenerationConfig) -> Prompt {
    Prompt {
        system: config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        user: build_user_prompt(text),
    }
}

/// Build the sampling parameters from the config.
pub fn build_params(config: &GenerationConfig) -> CompletionParams {
    CompletionParams {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Send `text` to the backend and parse the answer into a study guide.
///
/// Re-validates the payload first, whatever the caller already checked.
pub async fn request_study_guide(
    backend: &dyn ChatBackend,
    text: &str,
    config: &GenerationConfig,
) -> Result<(GenerationResult, GenerationStats), StudyGuideError> {
    guard::ensure_dispatchable(text, config.max_input_chars)?;

    let start = Instant::now();
    let params = build_params(config);
    let mut prompt = build_prompt(text, config);
    let mut stats = GenerationStats {
        input_chars: text.chars().count(),
        ..Default::default()
    };

    info!(
        "Dispatching {} chars to {} (temperature {}, max_tokens {})",
        stats.input_chars,
        backend.name(),
        params.temperature,
        params.max_tokens
    );

    loop {
        stats.attempts += 1;
        let reply = backend
            .complete(&prompt, params)
            .await
            .map_err(|message| {
                warn!("Generation request failed: {}", message);
                StudyGuideError::Transport { message }
            })?;

        stats.input_tokens += reply.prompt_tokens;
        stats.output_tokens += reply.completion_tokens;
        debug!(
            "Attempt {}: {} input tokens, {} output tokens",
            stats.attempts, reply.prompt_tokens, reply.completion_tokens
        );

        match parse::parse_response(&reply.content) {
            Ok(result) => {
                stats.duration_ms = start.elapsed().as_millis() as u64;
                return Ok((result, stats));
            }
            Err(e) => {
                warn!(raw = %reply.content, "Unusable model response: {}", e);
                if stats.attempts > config.repair_attempts {
                    return Err(e);
                }
                info!(
                    "Requesting repair ({}/{})",
                    stats.attempts, config.repair_attempts
                );
                prompt = Prompt {
                    system: prompt.system,
                    user: build_repair_prompt(&reply.content),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned answers and records every prompt it receives.
    struct Scripted {
        replies: Mutex<Vec<Result<String, String>>>,
        seen: Mutex<Vec<Prompt>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        fn name(&self) -> String {
            "scripted".into()
        }

        async fn complete(
            &self,
            prompt: &Prompt,
            _params: CompletionParams,
        ) -> Result<BackendReply, String> {
            self.seen.lock().unwrap().push(prompt.clone());
            let next = self.replies.lock().unwrap().pop().expect("no scripted reply left");
            next.map(|content| BackendReply {
                content,
                prompt_tokens: 10,
                completion_tokens: 5,
            })
        }
    }

    const GOOD: &str = r#"{"summary":"S","concepts":[{"term":"T","def":"D"}],"questions":["Q?"]}"#;

    #[test]
    fn params_follow_config() {
        let p = build_params(&GenerationConfig::default());
        assert!((p.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(p.max_tokens, 700);
    }

    #[test]
    fn prompt_uses_override_system_prompt() {
        let config = GenerationConfig::builder()
            .system_prompt("Be brief.")
            .build()
            .unwrap();
        let p = build_prompt("notes", &config);
        assert_eq!(p.system, "Be brief.");
        assert!(p.user.contains("notes"));
    }

    #[tokio::test]
    async fn single_exchange_on_success() {
        let backend = Scripted::new(vec![Ok(GOOD)]);
        let (result, stats) = request_study_guide(&backend, "Cells", &GenerationConfig::default())
            .await
            .unwrap();
        assert_eq!(result.summary, "S");
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.input_chars, 5);
        assert_eq!(stats.input_tokens, 10);
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_text_never_reaches_backend() {
        let backend = Scripted::new(vec![]);
        let err = request_study_guide(&backend, " \n ", &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyGuideError::EmptyInput));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn over_long_text_never_reaches_backend() {
        let backend = Scripted::new(vec![]);
        let text = "z".repeat(10_001);
        let err = request_study_guide(&backend, &text, &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyGuideError::InputTooLong { .. }));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_is_transport_without_retry() {
        let backend = Scripted::new(vec![Err("connection reset")]);
        let err = request_study_guide(&backend, "Cells", &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyGuideError::Transport { .. }));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_answer_is_not_retried_by_default() {
        let backend = Scripted::new(vec![Ok("I cannot help with that.")]);
        let err = request_study_guide(&backend, "Cells", &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyGuideError::MalformedResponse { .. }));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repair_attempt_sends_previous_answer_back() {
        let backend = Scripted::new(vec![Ok("{summary: oops}"), Ok(GOOD)]);
        let config = GenerationConfig::builder().repair_attempts(1).build().unwrap();
        let (result, stats) = request_study_guide(&backend, "Cells", &config).await.unwrap();
        assert_eq!(result.questions, vec!["Q?".to_string()]);
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.output_tokens, 10);

        let seen = backend.seen.lock().unwrap();
        assert!(seen[1].user.contains("{summary: oops}"));
        assert_eq!(seen[0].system, seen[1].system);
    }

    #[tokio::test]
    async fn repair_attempts_are_bounded() {
        let backend = Scripted::new(vec![Ok("nope"), Ok("still nope")]);
        let config = GenerationConfig::builder().repair_attempts(1).build().unwrap();
        let err = request_study_guide(&backend, "Cells", &config).await.unwrap_err();
        assert!(matches!(err, StudyGuideError::MalformedResponse { .. }));
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }
}
