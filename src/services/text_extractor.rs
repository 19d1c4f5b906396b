use crate::{
    errors::{PipelineError, PipelineResult},
    models::domain::{Document, DocumentKind, ExtractedText},
    services::{pdf_layout::order_fragments, pdf_text::read_fragments},
};

/// Pulls native text out of plain-text and PDF documents.
#[derive(Clone, Debug)]
pub struct TextExtractor {
    max_pages: u32,
}

impl TextExtractor {
    pub fn new(max_pages: u32) -> Self {
        Self { max_pages }
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub async fn extract(&self, document: &Document) -> PipelineResult<ExtractedText> {
        match document.kind() {
            Some(DocumentKind::PlainText) => {
                let text = decode_plain_text(&document.content);
                log::debug!(
                    "Decoded plain text document '{}' ({} chars)",
                    document.name,
                    text.chars().count()
                );
                Ok(ExtractedText::native(text, 1))
            }
            Some(DocumentKind::Pdf) => self.extract_pdf(document).await,
            None => Err(PipelineError::UnsupportedFormat(document.media_type.clone())),
        }
    }

    async fn extract_pdf(&self, document: &Document) -> PipelineResult<ExtractedText> {
        let bytes = document.content.clone();
        let max_pages = self.max_pages;

        let parsed = tokio::task::spawn_blocking(move || read_fragments(&bytes, max_pages)).await;

        let pages = match parsed {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                log::warn!(
                    "Native PDF parsing failed for '{}': {}; continuing with empty text",
                    document.name,
                    e
                );
                return Ok(ExtractedText::native(String::new(), 0));
            }
            Err(e) => {
                log::error!("PDF parsing worker failed for '{}': {}", document.name, e);
                return Ok(ExtractedText::native(String::new(), 0));
            }
        };

        let page_count = pages.pages.len() as u32;
        if pages.total_pages > page_count {
            log::info!(
                "'{}' has {} pages; reading the first {}",
                document.name,
                pages.total_pages,
                page_count
            );
        }

        let text = pages
            .pages
            .into_iter()
            .map(order_fragments)
            .filter(|page| !page.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        log::info!(
            "Extracted {} chars of native text from {} pages of '{}'",
            text.chars().count(),
            page_count,
            document.name
        );

        Ok(ExtractedText::native(text, page_count))
    }
}

/// Decodes plain text, honouring a UTF-8 or UTF-16 byte order mark.
/// Invalid sequences are replaced rather than rejected.
pub fn decode_plain_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
