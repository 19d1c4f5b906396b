use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::QuestionType;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_question_shape"))]
pub struct Question {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>, // mcq only
    #[serde(deserialize_with = "scalar_as_string")]
    #[schemars(with = "String")]
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Summary plus question set returned by the model.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate, JsonSchema)]
pub struct GenerationResult {
    pub summary: String,
    #[validate(nested)]
    pub questions: Vec<Question>,
}

fn validate_question_shape(question: &Question) -> Result<(), ValidationError> {
    if question.correct_answer.trim().is_empty() {
        return Err(ValidationError::new("empty_correct_answer"));
    }
    if question.question_type == QuestionType::Mcq {
        let options = question.options.as_deref().unwrap_or_default();
        if options.len() < 2 {
            return Err(ValidationError::new("mcq_requires_two_options"));
        }
        if options.iter().any(|o| o.trim().is_empty()) {
            return Err(ValidationError::new("mcq_empty_option"));
        }
    }
    Ok(())
}

// Small models answer tf questions with a bare `true`, or numeric answers as numbers.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "correctAnswer must be a string, got {}",
            other
        ))),
    }
}

impl GenerationResult {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn count_of(&self, question_type: QuestionType) -> usize {
        self.questions
            .iter()
            .filter(|q| q.question_type == question_type)
            .count()
    }
}
