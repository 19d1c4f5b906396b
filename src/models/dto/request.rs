use serde::Deserialize;
use validator::Validate;

use crate::models::domain::{Language, QuestionType};

pub const MAX_QUESTION_COUNT: u32 = 50;

/// Options submitted by the presentation layer before generation starts.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerationOptions {
    pub language: Language,

    #[validate(range(min = 1, max = MAX_QUESTION_COUNT))]
    pub question_count: u32,

    pub question_types: Vec<QuestionType>,
}

impl GenerationOptions {
    pub fn new(language: Language, question_count: u32, question_types: Vec<QuestionType>) -> Self {
        Self {
            language,
            question_count,
            question_types,
        }
    }

    pub fn resolved_types(&self) -> Vec<QuestionType> {
        QuestionType::resolve(&self.question_types)
    }
}
