use std::path::Path;

pub const MEDIA_TYPE_PDF: &str = "application/pdf";
pub const MEDIA_TYPE_TEXT: &str = "text/plain";

/// User-supplied input file, consumed once by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl Document {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content,
        }
    }

    /// Reads a file from disk and infers its media type from the extension,
    /// falling back to the PDF magic header.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let media_type = media_type_for(path, &content);

        Ok(Self {
            name,
            media_type,
            content,
        })
    }

    /// `None` when the document is neither PDF nor plain text.
    pub fn kind(&self) -> Option<DocumentKind> {
        let media_type = self.media_type.to_ascii_lowercase();
        if media_type == MEDIA_TYPE_PDF || self.content.starts_with(b"%PDF-") {
            Some(DocumentKind::Pdf)
        } else if media_type.starts_with("text/") {
            Some(DocumentKind::PlainText)
        } else {
            None
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.kind() == Some(DocumentKind::Pdf)
    }
}

fn media_type_for(path: &Path, content: &[u8]) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => MEDIA_TYPE_PDF.to_string(),
        Some("txt") | Some("text") => MEDIA_TYPE_TEXT.to_string(),
        Some("md") | Some("markdown") => "text/markdown".to_string(),
        Some("csv") => "text/csv".to_string(),
        _ if content.starts_with(b"%PDF-") => MEDIA_TYPE_PDF.to_string(),
        _ => "application/octet-stream".to_string(),
    }
}
