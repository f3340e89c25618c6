//! Offline integration tests: documents in, study guides out, no network.
//!
//! The model is replaced by a canned [`ChatBackend`]; nothing here needs an
//! API key or the pdfium library.

mod common;

use common::{docx, CannedBackend, GOOD_REPLY};
use edgequake_studyguide::prompts::{MATERIAL_END, MATERIAL_START};
use edgequake_studyguide::{
    from_plain_text, generate, generate_from_input, generate_from_upload, to_html, to_plain_text,
    ErrorKind, GenerationConfig, GuardWarning, PdfEngine, RawUpload, StudyGuideError,
};
use std::sync::Arc;

fn config_for(backend: &Arc<CannedBackend>) -> GenerationConfig {
    GenerationConfig::builder()
        .backend(backend.clone())
        .build()
        .unwrap()
}

// ── Documents ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn docx_upload_reaches_the_model_as_paragraphs() {
    let backend = CannedBackend::new(GOOD_REPLY);
    let engine = PdfEngine::new();
    let upload = RawUpload::new(
        "Biology.DOCX",
        docx(&["Cell theory", "All living things are made of cells & cell products."]),
    );

    let out = generate_from_upload(&upload, &engine, &config_for(&backend))
        .await
        .unwrap();

    assert_eq!(out.result.concepts.len(), 2);
    let prompt = backend.last_prompt().unwrap();
    assert!(prompt
        .user
        .contains("Cell theory\n\nAll living things are made of cells & cell products."));
    assert!(!engine.is_initialised());
}

#[tokio::test]
async fn local_markdown_file_is_sent_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chapter.md");
    let body = "# Osmosis\n\n* Water moves across a membrane.\n* From low to high solute.\n";
    std::fs::write(&path, body).unwrap();

    let backend = CannedBackend::new(GOOD_REPLY);
    let engine = PdfEngine::new();
    generate_from_input(path.to_str().unwrap(), &engine, &config_for(&backend))
        .await
        .unwrap();

    let user = backend.last_prompt().unwrap().user;
    assert!(user.contains(&format!("{MATERIAL_START}\n{body}\n{MATERIAL_END}")));
}

#[tokio::test]
async fn whitespace_only_file_never_dispatches() {
    let backend = CannedBackend::new(GOOD_REPLY);
    let engine = PdfEngine::new();
    let upload = RawUpload::new("blank.txt", b" \n\t \n".to_vec());

    let err = generate_from_upload(&upload, &engine, &config_for(&backend))
        .await
        .unwrap_err();

    assert!(matches!(err, StudyGuideError::EmptyInput));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn broken_docx_is_an_extraction_error() {
    let backend = CannedBackend::new(GOOD_REPLY);
    let engine = PdfEngine::new();
    let upload = RawUpload::new("notes.docx", b"this is not a zip".to_vec());

    let err = generate_from_upload(&upload, &engine, &config_for(&backend))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(err.user_message().contains(".docx"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn oversized_pdf_is_rejected_by_size_alone() {
    let backend = CannedBackend::new(GOOD_REPLY);
    let engine = PdfEngine::new();
    let upload = RawUpload::new("scan.pdf", vec![0u8; 10 * 1024 * 1024 + 1]);

    let err = generate_from_upload(&upload, &engine, &config_for(&backend))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("10 MB"));
    assert!(!engine.is_initialised(), "size check must run before the PDF engine");
}

// ── Guard and request ────────────────────────────────────────────────────────

#[tokio::test]
async fn long_paste_is_truncated_and_flagged() {
    let backend = CannedBackend::new(GOOD_REPLY);
    let text: String = "The Krebs cycle. ".repeat(800);
    let original = text.chars().count();

    let out = generate(&text, &config_for(&backend)).await.unwrap();

    assert_eq!(
        out.warnings,
        vec![GuardWarning::Truncated {
            original_chars: original,
            kept_chars: 10_000,
        }]
    );
    let expected: String = text.chars().take(10_000).collect();
    let user = backend.last_prompt().unwrap().user;
    assert!(user.contains(&format!("{MATERIAL_START}\n{expected}\n{MATERIAL_END}")));
}

#[tokio::test]
async fn request_uses_fixed_sampling_parameters() {
    let backend = CannedBackend::new(GOOD_REPLY);
    generate("Enzymes lower activation energy.", &config_for(&backend))
        .await
        .unwrap();

    let params = backend.last_params().unwrap();
    assert!((params.temperature - 0.4).abs() < f32::EPSILON);
    assert_eq!(params.max_tokens, 700);
    assert_eq!(backend.calls(), 1);

    let system = backend.last_prompt().unwrap().system;
    assert!(system.contains("JSON"));
}

// ── Responses ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn prose_wrapped_json_is_accepted() {
    let backend = CannedBackend::new("Sure! ```{\"summary\":\"S\",\"concepts\":[],\"questions\":[]}```");
    let out = generate("Anything", &config_for(&backend)).await.unwrap();
    assert_eq!(out.result.summary, "S");
    assert_eq!(out.result.detailed_summary, "");
    assert!(out.result.concepts.is_empty());
    assert!(out.result.questions.is_empty());
}

#[tokio::test]
async fn refusal_is_a_malformed_response() {
    let backend = CannedBackend::new("I cannot help with that.");
    let err = generate("Anything", &config_for(&backend)).await.unwrap_err();
    assert!(matches!(err, StudyGuideError::MalformedResponse { .. }));
    assert_eq!(
        err.user_message(),
        "The study guide could not be generated. Please try again."
    );
}

#[tokio::test]
async fn unrelated_json_is_an_invalid_shape() {
    let backend = CannedBackend::new(r#"{"title": "Cells", "body": "..."}"#);
    let err = generate("Anything", &config_for(&backend)).await.unwrap_err();
    assert!(matches!(err, StudyGuideError::InvalidShape { .. }));
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

// ── Export ───────────────────────────────────────────────────────────────────

#[test]
fn exported_guide_reads_back_identically() {
    let backend = CannedBackend::new(GOOD_REPLY);
    let out = tokio_test::block_on(generate("Cells", &config_for(&backend))).unwrap();

    let text = to_plain_text(&out.result);
    assert!(text.contains("1. Mitochondria\n   Organelle that produces ATP.\n"));
    assert!(text.contains("2. Where are proteins built?\n"));
    assert_eq!(from_plain_text(&text).unwrap(), out.result);

    let html = to_html(&out.result);
    assert!(html.contains("<title>Study Guide</title>"));
    assert!(html.contains("Cells are the basic unit of life."));
}
