//! Response parsing: raw model text → [`GenerationResult`].
//!
//! Two stages. The candidate JSON is sliced out of the reply (first `{` to
//! last `}`, or the whole reply when a brace is missing) and decoded strictly;
//! a decode failure is [`StudyGuideError::MalformedResponse`]. The decoded
//! value is then checked for shape and normalised field by field into the
//! typed result, so nothing dynamic leaves this module.

use crate::error::StudyGuideError;
use crate::output::{Concept, GenerationResult};
use serde_json::{Map, Value};
use tracing::debug;

/// Keys of which at least one must be present.
const REQUIRED_ANY: [&str; 3] = ["summary", "concepts", "questions"];

/// Parse and validate a model reply.
pub fn parse_response(raw: &str) -> Result<GenerationResult, StudyGuideError> {
    let candidate = json_candidate(raw);

    let value: Value =
        serde_json::from_str(candidate).map_err(|e| StudyGuideError::MalformedResponse {
            detail: e.to_string(),
        })?;

    let object = match value {
        Value::Object(map) => map,
        other => {
            return Err(StudyGuideError::InvalidShape {
                detail: format!("expected a JSON object, got {}", type_name(&other)),
            })
        }
    };

    if !REQUIRED_ANY.iter().any(|k| object.contains_key(*k)) {
        return Err(StudyGuideError::InvalidShape {
            detail: "none of summary, concepts, questions present".into(),
        });
    }

    let result = normalise(object);
    debug!(
        "Parsed study guide: {} concepts, {} questions",
        result.concepts.len(),
        result.questions.len()
    );
    Ok(result)
}

/// Slice from the first `{` to the last `}` inclusive.
///
/// Falls back to the whole input when either brace is missing or they are
/// out of order.
pub fn json_candidate(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

fn normalise(mut object: Map<String, Value>) -> GenerationResult {
    GenerationResult {
        summary: string_field(object.remove("summary")),
        detailed_summary: string_field(object.remove("detailed_summary")),
        concepts: array_field(object.remove("concepts"))
            .into_iter()
            .filter_map(concept_entry)
            .collect(),
        questions: array_field(object.remove("questions"))
            .into_iter()
            .filter_map(question_entry)
            .collect(),
    }
}

fn string_field(v: Option<Value>) -> String {
    match v {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

fn array_field(v: Option<Value>) -> Vec<Value> {
    match v {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// `{term, def}` objects are the expected form. A bare string is taken as a
/// term with no definition; other entries are dropped.
fn concept_entry(v: Value) -> Option<Concept> {
    match v {
        Value::Object(mut m) => {
            let term = string_field(m.remove("term"));
            let def = match m.remove("def") {
                Some(Value::String(s)) => s,
                _ => string_field(m.remove("definition")),
            };
            Some(Concept { term, def })
        }
        Value::String(term) => Some(Concept::new(term, "")),
        _ => None,
    }
}

fn question_entry(v: Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
