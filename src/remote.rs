//! Client for a remote study-guide endpoint.
//!
//! The thin-client deployment: the document is extracted and guarded
//! locally, only the text crosses the network, and the server holds the
//! model credential. The request body is `{"inputText": "..."}`; a
//! successful reply is the study-guide JSON and goes through the same
//! parser as a direct model answer. Error replies carry
//! `{"error": "...", "kind": "..."}`.

use crate::error::{ErrorKind, GuardWarning, StudyGuideError};
use crate::output::{GenerationOutput, GenerationStats};
use crate::pipeline::guard::{self, TextGate, MAX_INPUT_CHARS};
use crate::pipeline::parse;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Request body accepted by `POST /api/generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub input_text: String,
}

/// Error body returned by the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub kind: Option<ErrorKind>,
}

/// HTTP client for a `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    endpoint: String,
    http: reqwest::Client,
    max_input_chars: usize,
}

impl RemoteClient {
    /// `endpoint` is the full URL of the generate route.
    ///
    /// No request timeout is set; the transport's defaults apply.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, StudyGuideError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StudyGuideError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
            max_input_chars: MAX_INPUT_CHARS,
        })
    }

    /// Same client with an overall request timeout.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StudyGuideError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StudyGuideError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
            max_input_chars: MAX_INPUT_CHARS,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Guard `text`, send it, and parse the reply.
    pub async fn generate(&self, text: &str) -> Result<GenerationOutput, StudyGuideError> {
        let guarded = match guard::guard_text(text, self.max_input_chars) {
            TextGate::Blocked => return Err(StudyGuideError::EmptyInput),
            TextGate::Ready(g) => g,
        };
        let warnings: Vec<GuardWarning> = guarded.warning().cloned().into_iter().collect();
        guard::ensure_dispatchable(guarded.as_str(), self.max_input_chars)?;

        let start = Instant::now();
        info!("Sending {} chars to {}", guarded.char_len(), self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&GenerateRequest {
                input_text: guarded.as_str().to_string(),
            })
            .send()
            .await
            .map_err(|e| StudyGuideError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| StudyGuideError::Transport {
            message: e.to_string(),
        })?;
        debug!("Endpoint answered {} ({} bytes)", status, body.len());

        if !status.is_success() {
            let err = rejection(status.as_u16(), &body);
            warn!("Endpoint rejected the request: {}", err);
            return Err(err);
        }

        let result = parse::parse_response(&body).inspect_err(|e| {
            warn!(raw = %body, "Unusable endpoint response: {}", e);
        })?;

        Ok(GenerationOutput {
            result,
            warnings,
            stats: GenerationStats {
                input_chars: guarded.char_len(),
                duration_ms: start.elapsed().as_millis() as u64,
                attempts: 1,
                ..Default::default()
            },
        })
    }
}

/// Map a non-2xx reply to [`StudyGuideError::RemoteRejected`].
fn rejection(status: u16, body: &str) -> StudyGuideError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => StudyGuideError::RemoteRejected {
            status,
            kind: parsed.kind,
            message: parsed.error,
        },
        Err(_) => {
            let text = body.trim();
            StudyGuideError::RemoteRejected {
                status,
                kind: None,
                message: if text.is_empty() {
                    format!("Request failed with HTTP {status}")
                } else {
                    text.to_string()
                },
            }
        }
    }
}
