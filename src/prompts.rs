//! Prompts for study-guide generation.
//!
//! Every prompt lives here so tests can inspect them without a model and so
//! a wording change touches exactly one file. Callers can override the
//! system prompt via [`crate::config::GenerationConfig::system_prompt`].

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a study assistant that writes concise, \
exam-focused study guides. You reply with a single JSON object and nothing else: \
no Markdown, no code fences, no commentary.";

/// Opening delimiter of the study-material block in the user prompt.
pub const MATERIAL_START: &str = "<<<STUDY_MATERIAL";

/// Closing delimiter of the study-material block in the user prompt.
pub const MATERIAL_END: &str = "STUDY_MATERIAL>>>";

/// The JSON shape the model must return.
pub const RESPONSE_SHAPE: &str = r#"{
  "summary": "2-3 sentence overview of the material",
  "detailed_summary": "a longer summary covering every major point",
  "concepts": [{ "term": "key term", "def": "one-sentence definition" }],
  "questions": ["practice question 1", "practice question 2"]
}"#;

/// Build the user prompt embedding `text` verbatim inside a delimited block.
pub fn build_user_prompt(text: &str) -> String {
    format!(
        "Create a study guide from the study material below.\n\n\
Return ONLY a JSON object with exactly these four fields:\n\
{RESPONSE_SHAPE}\n\n\
Rules:\n\
- Include 5-10 concepts and 5-8 questions when the material allows it.\n\
- Base everything strictly on the material.\n\
- Do NOT wrap the JSON in ``` fences.\n\
- Do NOT add any text before or after the JSON object.\n\n\
{MATERIAL_START}\n{text}\n{MATERIAL_END}"
    )
}

/// Build the follow-up prompt used when repair attempts are enabled.
///
/// `invalid` is the previous answer that failed to parse.
pub fn build_repair_prompt(invalid: &str) -> String {
    format!(
        "Your previous answer was not a valid JSON object of the required shape.\n\n\
Previous answer:\n{invalid}\n\n\
Reply again with ONLY the corrected JSON object, using exactly this shape:\n\
{RESPONSE_SHAPE}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_embeds_text_verbatim_between_delimiters() {
        let text = "Mitochondria are the powerhouse of the cell.\n  Indented {braces}";
        let prompt = build_user_prompt(text);
        let start = prompt.find(MATERIAL_START).unwrap() + MATERIAL_START.len() + 1;
        let end = prompt.rfind(MATERIAL_END).unwrap() - 1;
        assert_eq!(&prompt[start..end], text);
    }

    #[test]
    fn user_prompt_names_all_four_fields() {
        let prompt = build_user_prompt("x");
        for field in ["\"summary\"", "\"detailed_summary\"", "\"concepts\"", "\"questions\""] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(prompt.contains("fences"));
    }

    #[test]
    fn system_prompt_is_json_only() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("JSON"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("exam-focused"));
    }

    #[test]
    fn repair_prompt_quotes_previous_answer() {
        let p = build_repair_prompt("Sure! here you go");
        assert!(p.contains("Sure! here you go"));
        assert!(p.contains("\"questions\""));
    }
}
