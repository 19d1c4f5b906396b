use lopdf::{content::Content, Document, Object, ObjectId};

use crate::services::{
    pdf_fonts::{page_decoders, FontDecoder},
    pdf_layout::TextFragment,
};

/// Positioned text of the first pages of a PDF.
#[derive(Debug, Default)]
pub struct PdfPages {
    pub total_pages: u32,
    pub pages: Vec<Vec<TextFragment>>,
}

// Kerning adjustments in TJ arrays below this value are read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Parses the PDF and collects text fragments from up to `max_pages` pages.
/// A page whose content stream cannot be decoded contributes no fragments.
pub fn read_fragments(bytes: &[u8], max_pages: u32) -> Result<PdfPages, lopdf::Error> {
    let mut doc = Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        doc.decrypt("")?;
    }

    let pages = doc.get_pages();
    let total_pages = pages.len() as u32;
    let mut out = Vec::new();

    for (number, page_id) in pages.into_iter().take(max_pages as usize) {
        match page_fragments(&doc, page_id) {
            Ok(fragments) => out.push(fragments),
            Err(e) => {
                log::warn!("Page {} skipped during native extraction: {}", number, e);
                out.push(Vec::new());
            }
        }
    }

    Ok(PdfPages {
        total_pages,
        pages: out,
    })
}

/// Text state tracked while walking a content stream. Only the line matrix
/// is kept: glyph widths are unknown, so fragments are placed at the start
/// of the line they were shown on.
struct TextCursor {
    line_matrix: [f32; 6],
    leading: f32,
}

impl TextCursor {
    fn new() -> Self {
        Self {
            line_matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            leading: 0.0,
        }
    }

    fn reset(&mut self) {
        self.line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
    }

    fn set_matrix(&mut self, m: [f32; 6]) {
        self.line_matrix = m;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.line_matrix;
        self.line_matrix = [a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f];
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.line_matrix[4], self.line_matrix[5])
    }
}

fn page_fragments(doc: &Document, page_id: ObjectId) -> Result<Vec<TextFragment>, lopdf::Error> {
    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)?;

    let fonts = page_decoders(doc, page_id);
    let unknown_font = FontDecoder::Guess;
    let mut font = &unknown_font;

    let mut cursor = TextCursor::new();
    let mut fragments = Vec::new();

    for op in &content.operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "BT" => cursor.reset(),
            "Tf" => {
                font = operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| fonts.get(name))
                    .unwrap_or(&unknown_font);
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands) {
                    cursor.set_matrix(m);
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    cursor.translate(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    cursor.leading = -ty;
                    cursor.translate(tx, ty);
                }
            }
            "TL" => {
                if let Some([leading]) = numbers::<1>(operands) {
                    cursor.leading = leading;
                }
            }
            "T*" => cursor.next_line(),
            "Tj" | "TJ" => push_fragment(&mut fragments, &cursor, font, operands.first()),
            "'" => {
                cursor.next_line();
                push_fragment(&mut fragments, &cursor, font, operands.first());
            }
            "\"" => {
                cursor.next_line();
                push_fragment(&mut fragments, &cursor, font, operands.get(2));
            }
            _ => {}
        }
    }

    Ok(fragments)
}

fn push_fragment(
    fragments: &mut Vec<TextFragment>,
    cursor: &TextCursor,
    font: &FontDecoder,
    operand: Option<&Object>,
) {
    let text = match operand {
        Some(Object::String(bytes, _)) => font.decode(bytes),
        Some(Object::Array(items)) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&font.decode(bytes)),
                    other => {
                        if number(other).is_some_and(|n| n < TJ_SPACE_THRESHOLD)
                            && !text.ends_with(' ')
                        {
                            text.push(' ');
                        }
                    }
                }
            }
            text
        }
        _ => return,
    };

    if text.trim().is_empty() {
        return;
    }
    let (x, y) = cursor.position();
    fragments.push(TextFragment::new(x, y, text));
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(out)
}
