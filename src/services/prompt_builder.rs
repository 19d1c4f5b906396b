use once_cell::sync::Lazy;

use crate::{
    constants::quiz_prompt::QUIZ_GENERATION_PROMPT,
    models::{
        domain::{GenerationRequest, GenerationResult, Language, QuestionDistribution, QuestionType},
        dto::GeminiRequest,
    },
};

/// Longest source text, in characters, embedded in a prompt.
pub const MAX_SOURCE_CHARS: usize = 35_000;

static RESULT_SCHEMA: Lazy<String> = Lazy::new(|| {
    let schema = schemars::schema_for!(GenerationResult);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
});

/// Truncates to at most `max_chars` characters without splitting one.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Resolves the question mix and truncates the source text. An empty type
/// selection means every type.
pub fn build(text: &str, lang: Language, count: u32, types: &[QuestionType]) -> GenerationRequest {
    let resolved = QuestionType::resolve(types);
    let distribution = QuestionDistribution::compute(count, &resolved);
    let source = truncate_chars(text.trim(), MAX_SOURCE_CHARS);
    if source.len() < text.trim().len() {
        log::info!(
            "Source text truncated to {} characters for the prompt",
            MAX_SOURCE_CHARS
        );
    }

    GenerationRequest::new(lang, count, resolved, distribution, source.to_string())
}

pub fn render_prompt(request: &GenerationRequest) -> String {
    let distribution = request
        .distribution()
        .entries()
        .iter()
        .map(|(t, n)| format!("  - {} `{}` questions ({})", n, t.as_str(), t.describe()))
        .collect::<Vec<_>>()
        .join("\n");

    // Source text goes in last so placeholders inside it stay untouched.
    QUIZ_GENERATION_PROMPT
        .replace("{language}", request.language().display_name())
        .replace("{total}", &request.question_count().to_string())
        .replace("{distribution}", &distribution)
        .replace("{schema}", &RESULT_SCHEMA)
        .replace("{text}", request.source_text())
}

pub fn request_body(request: &GenerationRequest) -> GeminiRequest {
    GeminiRequest::from_prompt(render_prompt(request))
}
