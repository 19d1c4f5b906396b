use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::GenerationResult;

/// Exam header details entered by the user at print time.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ExamMetadata {
    pub institution: Option<String>,
    pub teacher: Option<String>,
    pub subject: Option<String>,
    pub note: Option<String>,
    pub total_mark: f64,
}

/// State of one user session: the last successful result plus anything the
/// renderer attached to it.
#[derive(Clone, Debug, Serialize)]
pub struct StudySession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    last_result: Option<GenerationResult>,
    exam_metadata: Option<ExamMetadata>,
}

impl StudySession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            last_result: None,
            exam_metadata: None,
        }
    }

    pub fn last_result(&self) -> Option<&GenerationResult> {
        self.last_result.as_ref()
    }

    pub(crate) fn store_result(&mut self, result: GenerationResult) {
        self.last_result = Some(result);
        self.exam_metadata = None;
    }

    pub fn exam_metadata(&self) -> Option<&ExamMetadata> {
        self.exam_metadata.as_ref()
    }

    pub fn annotate_exam(&mut self, metadata: ExamMetadata) {
        self.exam_metadata = Some(metadata);
    }

    /// Marks per question, rounded to one decimal. `None` when no total mark
    /// was entered or there is nothing to mark.
    pub fn mark_per_question(&self) -> Option<f64> {
        let total = self.exam_metadata.as_ref()?.total_mark;
        let count = self.last_result.as_ref()?.questions.len();
        if total <= 0.0 || count == 0 {
            return None;
        }
        Some((total / count as f64 * 10.0).round() / 10.0)
    }
}

impl Default for StudySession {
    fn default() -> Self {
        Self::new()
    }
}
