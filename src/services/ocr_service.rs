use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    config::Config,
    constants::messages::Milestone,
    errors::{OcrError, PipelineError, PipelineResult},
    models::domain::{Document, ExtractedText, Language},
    services::progress::{report, PipelineObserver},
};

/// Native text shorter than this is treated as a scanned document.
pub const OCR_MIN_CHARS: usize = 200;

/// Watermarks left by mobile scanner apps. Their presence means the text
/// layer, if any, is an overlay and not the document content.
pub const SCANNER_ARTIFACT_MARKERS: &[&str] = &[
    "CamScanner",
    "Scanned with",
    "Adobe Scan",
    "Genius Scan",
    "ScannerPro",
    "Microsoft Lens",
];

/// Best-effort heuristic deciding whether OCR should replace native text.
pub fn should_fallback_to_ocr(extracted: &ExtractedText) -> bool {
    let trimmed = extracted.text.trim();
    trimmed.is_empty()
        || trimmed.chars().count() < OCR_MIN_CHARS
        || contains_scanner_artifact(trimmed)
}

pub fn contains_scanner_artifact(text: &str) -> bool {
    SCANNER_ARTIFACT_MARKERS.iter().any(|m| text.contains(m))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Renders pages `1..=last_page` of the PDF into `out_dir` and returns
    /// the image paths in page order.
    async fn rasterize(
        &self,
        pdf_path: &Path,
        last_page: u32,
        scale: f32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, OcrError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image_path: &Path, languages: &str) -> Result<String, OcrError>;
}

/// `pdftoppm` from poppler-utils.
pub struct PdftoppmRasterizer;

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn rasterize(
        &self,
        pdf_path: &Path,
        last_page: u32,
        scale: f32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, OcrError> {
        let dpi = (72.0 * scale).round() as u32;
        let prefix = out_dir.join("page");

        log::info!("Running pdftoppm at {} dpi for pages 1-{}", dpi, last_page);

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(last_page.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| OcrError::ToolUnavailable {
                tool: "pdftoppm".to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "pdftoppm".to_string(),
                page: 0,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut images = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(page) = page_number(&path) {
                images.push((page, path));
            }
        }
        images.sort_by_key(|(page, _)| *page);

        Ok(images.into_iter().map(|(_, path)| path).collect())
    }
}

// pdftoppm names its output `page-1.png` or `page-01.png` depending on the page count.
fn page_number(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit('-').next()?.parse().ok()
}

/// The `tesseract` command line engine.
pub struct TesseractRecognizer;

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image_path: &Path, languages: &str) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(languages)
            .output()
            .await
            .map_err(|e| OcrError::ToolUnavailable {
                tool: "tesseract".to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "tesseract".to_string(),
                page: page_number(image_path).unwrap_or(0),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).replace('\x0c', ""))
    }
}

/// Rasterizes a PDF and recognizes each page in turn.
pub struct OcrEngine {
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn TextRecognizer>,
    max_pages: u32,
    scale: f32,
    languages: String,
}

impl OcrEngine {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
        max_pages: u32,
        scale: f32,
        languages: impl Into<String>,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            max_pages,
            scale,
            languages: languages.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(PdftoppmRasterizer),
            Arc::new(TesseractRecognizer),
            config.max_ocr_pages,
            config.ocr_scale,
            config.ocr_languages.clone(),
        )
    }

    /// Recognizes pages `1..=min(page_hint, max_pages)`. A zero hint (the
    /// page count was unknown) reads up to the cap. Any failure is fatal.
    pub async fn recognize(
        &self,
        document: &Document,
        page_hint: u32,
        lang: Language,
        observer: &dyn PipelineObserver,
    ) -> PipelineResult<ExtractedText> {
        if !document.is_pdf() {
            return Err(PipelineError::OcrFailure(format!(
                "'{}' is not a PDF",
                document.name
            )));
        }

        let last_page = if page_hint == 0 {
            self.max_pages
        } else {
            page_hint.min(self.max_pages)
        };

        let workdir = tempfile::tempdir().map_err(OcrError::from)?;
        let pdf_path = workdir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, &document.content)
            .await
            .map_err(OcrError::from)?;

        let images = self
            .rasterizer
            .rasterize(&pdf_path, last_page, self.scale, workdir.path())
            .await?;

        if images.is_empty() {
            return Err(OcrError::NoPages.into());
        }

        let total = images.len() as u32;
        let mut pages = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let page = index as u32 + 1;
            report(observer, Milestone::Ocr { page, total }, lang);

            let text = self.recognizer.recognize(image, &self.languages).await?;
            log::debug!("OCR page {}/{}: {} chars", page, total, text.chars().count());
            pages.push(text.trim().to_string());
        }

        let text = pages
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        log::info!(
            "OCR recognized {} chars from {} pages of '{}'",
            text.chars().count(),
            total,
            document.name
        );

        Ok(ExtractedText::ocr(text, total))
    }
}
