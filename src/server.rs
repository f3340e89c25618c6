//! HTTP endpoint for study-guide generation (feature `server`).
//!
//! | Route | Method | Body |
//! |-------|--------|------|
//! | `/api/generate` | POST | `{"inputText": "..."}` → study-guide JSON |
//! | `/api/extract?filename=notes.pdf` | POST | raw file bytes → `{"text": "...", "warnings": [...]}` |
//! | `/api/health` | GET | `{"status": "ok", "version": "..."}` |
//!
//! The server holds the model credential. Clients that cannot extract
//! documents themselves post the file to `/api/extract` first and then send
//! the returned text. The generate payload is re-validated here (blank → 400,
//! over the character limit → 400) whatever the client already checked.
//! Errors are returned as `{"error": <user message>, "kind": <kind>}`.

use crate::config::GenerationConfig;
use crate::error::{ErrorKind, StudyGuideError};
use crate::generate;
use crate::output::GenerationOutput;
use crate::pipeline::guard::{self, DOCUMENT_UPLOAD_LIMIT};
use crate::pipeline::input::RawUpload;
use crate::pipeline::pdf::PdfEngine;
use crate::remote::GenerateRequest;
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Body ceiling for `/api/extract`. Slightly above the largest upload
/// ceiling so oversized files get the JSON 413 from the guard.
const EXTRACT_BODY_LIMIT: usize = DOCUMENT_UPLOAD_LIMIT + 64 * 1024;

/// Listen address, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// `STUDYGUIDE_HOST` and `STUDYGUIDE_PORT`, falling back to `0.0.0.0:8080`.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let host = env("STUDYGUIDE_HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);
        let port = match env("STUDYGUIDE_PORT") {
            Some(p) => p.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid STUDYGUIDE_PORT '{}'", p);
                defaults.port
            }),
            None => defaults.port,
        };
        Self { host, port }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GenerationConfig>,
    pub engine: Arc<PdfEngine>,
}

impl AppState {
    pub fn new(config: GenerationConfig, engine: Arc<PdfEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }
}

/// Routes without middleware.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/generate", post(generate_guide))
        .route(
            "/api/extract",
            post(extract_document).layer(DefaultBodyLimit::max(EXTRACT_BODY_LIMIT)),
        )
}

/// Routes with state, CORS and request tracing applied.
pub fn app(state: AppState) -> Router {
    create_router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": VERSION })),
    )
}

#[instrument(skip_all)]
async fn generate_guide(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            return error_body(
                StatusCode::BAD_REQUEST,
                "Request body must be JSON of the form {\"inputText\": \"...\"}.",
                ErrorKind::Validation,
            );
        }
    };

    if let Err(e) = guard::ensure_dispatchable(&req.input_text, state.config.max_input_chars) {
        info!("Rejected input: {}", e);
        return error_response(&e);
    }

    match generate::generate(&req.input_text, &state.config).await {
        Ok(output) => (StatusCode::OK, Json(success_body(&output))).into_response(),
        Err(e) => {
            match e.kind() {
                ErrorKind::Validation => info!("Generation rejected: {}", e),
                _ => error!(error = %e, "Generation failed"),
            }
            error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    filename: String,
}

#[instrument(skip_all)]
async fn extract_document(
    State(state): State<AppState>,
    query: Result<Query<ExtractQuery>, QueryRejection>,
    body: Bytes,
) -> Response {
    let Query(q) = match query {
        Ok(q) => q,
        Err(rejection) => {
            warn!("Rejected extract query: {}", rejection.body_text());
            return error_body(
                StatusCode::BAD_REQUEST,
                "A filename query parameter is required, e.g. /api/extract?filename=notes.pdf.",
                ErrorKind::Validation,
            );
        }
    };

    let upload = RawUpload::new(q.filename, body.to_vec());
    let prepared = match generate::extract_upload(&upload, &state.engine, &state.config).await {
        Ok(text) => generate::prepare_text(&text, &state.config),
        Err(e) => Err(e),
    };

    match prepared {
        Ok(guarded) => {
            let warnings: Vec<String> =
                guarded.warning().map(|w| w.to_string()).into_iter().collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "text": guarded.as_str(), "warnings": warnings })),
            )
                .into_response()
        }
        Err(e) => {
            info!("Extraction rejected: {}", e);
            error_response(&e)
        }
    }
}

/// The study-guide fields at the top level, plus `warnings`.
fn success_body(output: &GenerationOutput) -> serde_json::Value {
    let mut body = serde_json::json!({
        "summary": output.result.summary,
        "detailed_summary": output.result.detailed_summary,
        "concepts": output.result.concepts,
        "questions": output.result.questions,
    });
    if !output.warnings.is_empty() {
        body["warnings"] = serde_json::json!(output
            .warnings
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>());
    }
    body
}

/// HTTP status for an error.
pub fn status_for(e: &StudyGuideError) -> StatusCode {
    if matches!(e, StudyGuideError::PayloadTooLarge { .. }) {
        return StatusCode::PAYLOAD_TOO_LARGE;
    }
    match e.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Transport | ErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: &StudyGuideError) -> Response {
    error_body(status_for(e), &e.user_message(), e.kind())
}

fn error_body(status: StatusCode, message: &str, kind: ErrorKind) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message, "kind": kind })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults_and_overrides() {
        let c = ServerConfig::from_lookup(|_| None);
        assert_eq!(c.addr(), "0.0.0.0:8080");

        let c = ServerConfig::from_lookup(|k| match k {
            "STUDYGUIDE_HOST" => Some("127.0.0.1".into()),
            "STUDYGUIDE_PORT" => Some("9000".into()),
            _ => None,
        });
        assert_eq!(c.addr(), "127.0.0.1:9000");

        let c = ServerConfig::from_lookup(|k| (k == "STUDYGUIDE_PORT").then(|| "http".to_string()));
        assert_eq!(c.port, 8080);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(&StudyGuideError::EmptyInput), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&StudyGuideError::PayloadTooLarge {
                filename: "a.pdf".into(),
                size: 1,
                limit_mib: 10
            }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&StudyGuideError::MissingCredential {
                provider: "openai".into(),
                hint: String::new()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&StudyGuideError::Extraction {
                extension: "pdf".into(),
                detail: String::new()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&StudyGuideError::Transport { message: String::new() }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&StudyGuideError::MalformedResponse { detail: String::new() }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn success_body_is_flat_study_guide() {
        let output = GenerationOutput {
            result: crate::output::GenerationResult {
                summary: "S".into(),
                ..Default::default()
            },
            warnings: vec![],
            stats: Default::default(),
        };
        let body = success_body(&output);
        assert_eq!(body["summary"], "S");
        assert!(body["concepts"].as_array().unwrap().is_empty());
        assert!(body.get("warnings").is_none());
    }
}
