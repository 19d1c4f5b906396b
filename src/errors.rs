use thiserror::Error;

use crate::models::domain::Language;

/// Why a single generation attempt against one model candidate failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    #[error("Credential rejected by the generation service")]
    AuthInvalid,

    #[error("Rate limited by model {0}")]
    RateLimited(String),

    #[error("HTTP {status} from model {model}: {body}")]
    HttpStatus {
        model: String,
        status: u16,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unreadable document: only {chars} characters could be extracted")]
    UnreadableDocument { chars: usize },

    #[error("OCR failure: {0}")]
    OcrFailure(String),

    #[error("Generation failed after {attempts} attempts: {cause}")]
    GenerationFailure {
        cause: AttemptFailure,
        attempts: u32,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl PipelineError {
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            PipelineError::UnreadableDocument { .. } => "UNREADABLE_DOCUMENT",
            PipelineError::OcrFailure(_) => "OCR_FAILURE",
            PipelineError::GenerationFailure { .. } => "GENERATION_FAILURE",
            PipelineError::InvalidOptions(_) => "INVALID_OPTIONS",
        }
    }

    /// True when the failure was caused by a rejected or missing credential,
    /// meaning the caller should ask the user for a new key.
    pub fn is_auth_invalid(&self) -> bool {
        matches!(
            self,
            PipelineError::GenerationFailure {
                cause: AttemptFailure::AuthInvalid,
                ..
            }
        )
    }

    /// Localized message shown to the user before returning to the options step.
    pub fn user_message(&self, lang: Language) -> String {
        match (self, lang) {
            (PipelineError::UnsupportedFormat(_), Language::Ar) => {
                "صيغة الملف غير مدعومة. استخدم ملف PDF أو ملفاً نصياً.".to_string()
            }
            (PipelineError::UnsupportedFormat(_), Language::En) => {
                "Unsupported file type. Please use a PDF or a plain text file.".to_string()
            }
            (PipelineError::UnreadableDocument { .. }, Language::Ar) => {
                "تعذر قراءة نص كافٍ من الملف.".to_string()
            }
            (PipelineError::UnreadableDocument { .. }, Language::En) => {
                "Not enough readable text could be extracted from the file.".to_string()
            }
            (PipelineError::OcrFailure(_), Language::Ar) => {
                "فشل التعرف الضوئي على النص. قد يكون الملف تالفاً أو محمياً.".to_string()
            }
            (PipelineError::OcrFailure(_), Language::En) => {
                "Text recognition failed. The file may be corrupt or encrypted.".to_string()
            }
            (err, Language::Ar) if err.is_auth_invalid() => {
                "مفتاح API غير صالح. يرجى إدخال مفتاح جديد.".to_string()
            }
            (err, Language::En) if err.is_auth_invalid() => {
                "The API key was rejected. Please enter a new key.".to_string()
            }
            (PipelineError::GenerationFailure { .. }, Language::Ar) => {
                format!("خطأ تقني: {}", self)
            }
            (PipelineError::GenerationFailure { .. }, Language::En) => {
                format!("Technical error: {}", self)
            }
            (PipelineError::InvalidOptions(msg), Language::Ar) => {
                format!("خيارات غير صالحة: {}", msg)
            }
            (PipelineError::InvalidOptions(msg), Language::En) => {
                format!("Invalid options: {}", msg)
            }
        }
    }
}

impl From<validator::ValidationErrors> for PipelineError {
    fn from(err: validator::ValidationErrors) -> Self {
        PipelineError::InvalidOptions(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrError {
    #[error("Failed to start {tool}: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    #[error("{tool} failed for page {page}: {stderr}")]
    ToolFailed {
        tool: String,
        page: u32,
        stderr: String,
    },

    #[error("No pages were rendered")]
    NoPages,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for OcrError {
    fn from(err: std::io::Error) -> Self {
        OcrError::Io(err.to_string())
    }
}

impl From<OcrError> for PipelineError {
    fn from(err: OcrError) -> Self {
        PipelineError::OcrFailure(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("API key has an unexpected format")]
    InvalidFormat,

    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for CredentialError {
    fn from(err: std::io::Error) -> Self {
        CredentialError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CredentialError {
    fn from(err: serde_json::Error) -> Self {
        CredentialError::Storage(format!("JSON error: {}", err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
