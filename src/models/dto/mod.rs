pub mod gemini;
pub mod request;
pub use gemini::{GeminiRequest, GeminiResponse};
pub use request::GenerationOptions;
