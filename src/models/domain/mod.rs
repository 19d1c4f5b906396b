pub mod document;
pub mod extracted_text;
pub mod generation_request;
pub mod question;
pub mod session;
pub use document::{Document, DocumentKind};
pub use extracted_text::{ExtractedText, Provenance};
pub use generation_request::{GenerationRequest, Language, QuestionDistribution, QuestionType};
pub use question::{GenerationResult, Question};
pub use session::{ExamMetadata, StudySession};
