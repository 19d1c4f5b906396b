pub mod generation_client;
pub mod ocr_service;
pub mod pdf_fonts;
pub mod pdf_layout;
pub mod pdf_text;
pub mod pipeline_orchestrator;
pub mod progress;
pub mod prompt_builder;
pub mod response_parser;
pub mod text_extractor;
pub mod transport;

pub use generation_client::{GenerationClient, RetrySettings, Sleeper, TokioSleeper};
pub use ocr_service::OcrEngine;
pub use pipeline_orchestrator::PipelineOrchestrator;
pub use progress::PipelineObserver;
pub use text_extractor::TextExtractor;
pub use transport::{GeminiHttpTransport, GenerationTransport, TransportResponse};
