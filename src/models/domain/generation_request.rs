use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Language the summary and questions are written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ar,
    En,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Ar => "Arabic",
            Language::En => "English",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ar" => Ok(Language::Ar),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language '{}' (expected ar or en)", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Ar => write!(f, "ar"),
            Language::En => write!(f, "en"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,       // multiple choice, carries options
    Tf,        // true / false
    Fill,      // fill in the blank
    Reasoning, // short explanation answer
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Mcq,
        QuestionType::Tf,
        QuestionType::Fill,
        QuestionType::Reasoning,
    ];

    /// Selected types in first-seen order without duplicates; an empty
    /// selection means every type.
    pub fn resolve(selection: &[QuestionType]) -> Vec<QuestionType> {
        let mut resolved: Vec<QuestionType> = Vec::with_capacity(selection.len());
        for t in selection {
            if !resolved.contains(t) {
                resolved.push(*t);
            }
        }
        if resolved.is_empty() {
            resolved.extend(QuestionType::ALL);
        }
        resolved
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Tf => "tf",
            QuestionType::Fill => "fill",
            QuestionType::Reasoning => "reasoning",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "multiple choice with 4 options",
            QuestionType::Tf => "true/false statements",
            QuestionType::Fill => "fill in the blank",
            QuestionType::Reasoning => "short reasoning / explain-why",
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcq" => Ok(QuestionType::Mcq),
            "tf" => Ok(QuestionType::Tf),
            "fill" => Ok(QuestionType::Fill),
            "reasoning" => Ok(QuestionType::Reasoning),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact number of questions requested per type, in the caller's type order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionDistribution {
    entries: Vec<(QuestionType, u32)>,
}

impl QuestionDistribution {
    /// Splits `count` evenly across `types`; the first `count % types.len()`
    /// types receive one extra question.
    pub fn compute(count: u32, types: &[QuestionType]) -> Self {
        if types.is_empty() {
            return Self { entries: Vec::new() };
        }

        let n = types.len() as u32;
        let base = count / n;
        let remainder = count % n;

        let entries = types
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let extra = if (i as u32) < remainder { 1 } else { 0 };
                (*t, base + extra)
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[(QuestionType, u32)] {
        &self.entries
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn count_for(&self, question_type: QuestionType) -> u32 {
        self.entries
            .iter()
            .find(|(t, _)| *t == question_type)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Fully-resolved input to one generation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    language: Language,
    question_count: u32,
    question_types: Vec<QuestionType>,
    distribution: QuestionDistribution,
    source_text: String,
}

impl GenerationRequest {
    pub(crate) fn new(
        language: Language,
        question_count: u32,
        question_types: Vec<QuestionType>,
        distribution: QuestionDistribution,
        source_text: String,
    ) -> Self {
        Self {
            language,
            question_count,
            question_types,
            distribution,
            source_text,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn question_types(&self) -> &[QuestionType] {
        &self.question_types
    }

    pub fn distribution(&self) -> &QuestionDistribution {
        &self.distribution
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }
}
