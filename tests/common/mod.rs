//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_studyguide::pipeline::llm::{BackendReply, CompletionParams, Prompt};
use edgequake_studyguide::ChatBackend;
use docx_rs::{Docx, Paragraph, Run};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const GOOD_REPLY: &str = r#"{
  "summary": "Cells are the basic unit of life.",
  "detailed_summary": "Every organism is made of cells. Organelles divide the work.",
  "concepts": [
    {"term": "Mitochondria", "def": "Organelle that produces ATP."},
    {"term": "Ribosome", "def": "Builds proteins."}
  ],
  "questions": ["What does the mitochondrion produce?", "Where are proteins built?"]
}"#;

/// Answers every prompt with the same text and records what it was sent.
pub struct CannedBackend {
    reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
    params: Mutex<Vec<CompletionParams>>,
}

impl CannedBackend {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            params: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }

    pub fn last_params(&self) -> Option<CompletionParams> {
        self.params.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl ChatBackend for CannedBackend {
    fn name(&self) -> String {
        "canned".into()
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        params: CompletionParams,
    ) -> Result<BackendReply, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        self.params.lock().unwrap().push(params);
        Ok(BackendReply {
            content: self.reply.clone(),
            prompt_tokens: 120,
            completion_tokens: 80,
        })
    }
}

/// .docx document with one paragraph per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    paragraphs
        .iter()
        .fold(Docx::new(), |doc, p| {
            doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*p)))
        })
        .build()
        .pack(&mut buf)
        .unwrap();
    buf.into_inner()
}
