use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Native,
    Ocr,
}

/// Plain text derived from a document, tagged with how it was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub provenance: Provenance,
    pub page_count: u32,
}

impl ExtractedText {
    pub fn native(text: impl Into<String>, page_count: u32) -> Self {
        Self {
            text: text.into(),
            provenance: Provenance::Native,
            page_count,
        }
    }

    pub fn ocr(text: impl Into<String>, page_count: u32) -> Self {
        Self {
            text: text.into(),
            provenance: Provenance::Ocr,
            page_count,
        }
    }

    /// Length in characters of the trimmed text.
    pub fn char_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}
