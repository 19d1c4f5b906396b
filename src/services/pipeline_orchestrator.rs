use validator::Validate;

use crate::{
    constants::messages::Milestone,
    errors::{PipelineError, PipelineResult},
    models::{
        domain::{Document, ExtractedText, GenerationResult, Provenance, StudySession},
        dto::GenerationOptions,
    },
    services::{
        generation_client::GenerationClient,
        ocr_service::{should_fallback_to_ocr, OcrEngine},
        progress::{report, PipelineObserver},
        prompt_builder,
        text_extractor::TextExtractor,
    },
};

/// Below this many characters the document is rejected before any network call.
pub const MIN_READABLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    Extracting,
    Recognizing,
    Generating,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Validating => write!(f, "validating"),
            PipelineStage::Extracting => write!(f, "extracting"),
            PipelineStage::Recognizing => write!(f, "recognizing"),
            PipelineStage::Generating => write!(f, "generating"),
        }
    }
}

/// Runs one document through extraction, optional OCR, prompt building and
/// generation, storing the result in the owned session.
pub struct PipelineOrchestrator {
    extractor: TextExtractor,
    ocr: OcrEngine,
    client: GenerationClient,
    session: StudySession,
}

impl PipelineOrchestrator {
    pub fn new(extractor: TextExtractor, ocr: OcrEngine, client: GenerationClient) -> Self {
        Self {
            extractor,
            ocr,
            client,
            session: StudySession::new(),
        }
    }

    pub fn session(&self) -> &StudySession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut StudySession {
        &mut self.session
    }

    pub async fn run(
        &mut self,
        document: &Document,
        options: &GenerationOptions,
        observer: &dyn PipelineObserver,
    ) -> PipelineResult<GenerationResult> {
        log::info!(
            "Session {}: processing '{}' ({} bytes)",
            self.session.id,
            document.name,
            document.content.len()
        );

        match self.execute(document, options, observer).await {
            Ok(result) => {
                report(observer, Milestone::Complete, options.language);
                self.session.store_result(result.clone());
                Ok(result)
            }
            Err((stage, err)) => {
                log::error!(
                    "Session {}: {} stage failed [{}]: {}",
                    self.session.id,
                    stage,
                    err.error_code(),
                    err
                );
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        document: &Document,
        options: &GenerationOptions,
        observer: &dyn PipelineObserver,
    ) -> Result<GenerationResult, (PipelineStage, PipelineError)> {
        let lang = options.language;

        options
            .validate()
            .map_err(|e| (PipelineStage::Validating, PipelineError::from(e)))?;

        report(observer, Milestone::Reading, lang);
        let mut extracted = self
            .extractor
            .extract(document)
            .await
            .map_err(|e| (PipelineStage::Extracting, e))?;

        if document.is_pdf() && should_fallback_to_ocr(&extracted) {
            log::info!(
                "Native text too thin ({} chars); falling back to OCR",
                extracted.char_len()
            );
            extracted = self
                .ocr
                .recognize(document, extracted.page_count, lang, observer)
                .await
                .map_err(|e| (PipelineStage::Recognizing, e))?;
        }

        ensure_readable(&extracted).map_err(|e| (PipelineStage::Extracting, e))?;

        report(observer, Milestone::Analysing, lang);
        let request = prompt_builder::build(
            &extracted.text,
            lang,
            options.question_count,
            &options.resolved_types(),
        );
        log::debug!(
            "Built request: {} questions over {:?}",
            request.question_count(),
            request.question_types()
        );

        report(observer, Milestone::Generating, lang);
        self.client
            .generate(&request, observer)
            .await
            .map_err(|e| (PipelineStage::Generating, e))
    }
}

fn ensure_readable(extracted: &ExtractedText) -> PipelineResult<()> {
    let chars = extracted.char_len();
    if chars < MIN_READABLE_CHARS {
        let source = match extracted.provenance {
            Provenance::Native => "native extraction",
            Provenance::Ocr => "OCR",
        };
        log::warn!("Only {} characters after {}", chars, source);
        return Err(PipelineError::UnreadableDocument { chars });
    }
    Ok(())
}
