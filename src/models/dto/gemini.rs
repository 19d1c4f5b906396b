use serde::{Deserialize, Serialize};

/// `generateContent` request body: `{contents:[{parts:[{text}]}]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

impl GeminiRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.into(),
                }],
            }],
        }
    }

    pub fn prompt_text(&self) -> Option<&str> {
        self.contents
            .first()
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GeminiResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Result<&str, String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(format!("prompt blocked: {}", reason));
        }

        let candidate = self
            .candidates
            .first()
            .ok_or_else(|| "response has no candidates".to_string())?;

        candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| match candidate.finish_reason.as_deref() {
                Some(reason) => format!("candidate has no text (finish reason {})", reason),
                None => "candidate has no text".to_string(),
            })
    }
}
