#[cfg(test)]
pub mod fixtures {
    use lopdf::{
        content::{Content, Operation},
        dictionary, Document, Object, Stream, StringFormat,
    };

    use crate::models::domain::{GenerationResult, Question, QuestionType};

    pub const TEST_API_KEY: &str = "AIzaSyTestKeyTestKeyTestKeyTestKey000";

    const SAMPLE_SENTENCE: &str =
        "The cell membrane controls which substances enter and leave the cell. ";

    /// Readable filler text of exactly `n` characters with no surrounding whitespace.
    pub fn text_of_len(n: usize) -> String {
        let mut text: String = SAMPLE_SENTENCE.chars().cycle().take(n).collect();
        if text.ends_with(' ') {
            text.pop();
            text.push('.');
        }
        text
    }

    /// A valid result with `n` questions cycling through every type.
    pub fn sample_result(n: usize) -> GenerationResult {
        let questions = (0..n)
            .map(|i| {
                let question_type = QuestionType::ALL[i % QuestionType::ALL.len()];
                let (options, answer) = match question_type {
                    QuestionType::Mcq => (
                        Some(vec![
                            "Membrane".to_string(),
                            "Nucleus".to_string(),
                            "Wall".to_string(),
                            "Ribosome".to_string(),
                        ]),
                        "Membrane".to_string(),
                    ),
                    QuestionType::Tf => (None, "true".to_string()),
                    QuestionType::Fill => (None, "membrane".to_string()),
                    QuestionType::Reasoning => {
                        (None, "It controls what enters and leaves.".to_string())
                    }
                };
                Question {
                    question_type,
                    text: format!("Question {} about the cell membrane", i + 1),
                    options,
                    correct_answer: answer,
                    source_quote: Some(SAMPLE_SENTENCE.trim().to_string()),
                    explanation: Some("Stated in the first sentence.".to_string()),
                }
            })
            .collect();

        GenerationResult {
            summary: "## The cell membrane\n- **Controls** transport".to_string(),
            questions,
        }
    }

    pub fn result_json(n: usize) -> String {
        serde_json::to_string(&sample_result(n)).expect("fixture serializes")
    }

    /// A `generateContent` response whose first part carries `text`.
    pub fn gemini_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": text}], "role": "model"},
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    /// Font installed as resource `F1` in fixture PDFs.
    pub enum FixtureFont<'a> {
        Courier,
        /// Type0 subset font with two-byte glyph ids, optionally carrying a
        /// ToUnicode CMap.
        Identity { to_unicode: Option<&'a str> },
    }

    /// Maps glyphs 0x0003, 0x0004 and 0x0010 to ع, ل and م.
    pub const ARABIC_TO_UNICODE: &str = "\
/CIDInit /ProcSet findresource begin
begincmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0639>
<0004> <0644>
endbfchar
1 beginbfrange
<0010> <0010> <0645>
endbfrange
endcmap";

    /// A hex string operand holding two-byte glyph ids.
    pub fn glyph_ids(ids: impl IntoIterator<Item = u16>) -> Object {
        let bytes = ids.into_iter().flat_map(u16::to_be_bytes).collect();
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    /// Builds a PDF with one page per operation list.
    pub fn pdf_from_operations(pages: Vec<Vec<Operation>>) -> Vec<u8> {
        pdf_with_font(pages, FixtureFont::Courier)
    }

    pub fn pdf_with_font(pages: Vec<Vec<Operation>>, font: FixtureFont<'_>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = match font {
            FixtureFont::Courier => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier",
            }),
            FixtureFont::Identity { to_unicode } => {
                let mut dict = dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type0",
                    "BaseFont" => "ABCDEF+Amiri-Regular",
                    "Encoding" => "Identity-H",
                };
                if let Some(cmap) = to_unicode {
                    let cmap_id = doc.add_object(Stream::new(dictionary! {}, cmap.as_bytes().to_vec()));
                    dict.set("ToUnicode", cmap_id);
                }
                doc.add_object(dict)
            }
        };
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for operations in pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("content encodes"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("pdf saves");
        buf
    }

    /// One line of text per page.
    pub fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
        let pages = texts
            .iter()
            .map(|text| {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            })
            .collect();
        pdf_from_operations(pages)
    }
}

#[cfg(test)]
pub mod test_helpers {
    use std::{sync::Mutex, time::Duration};

    use async_trait::async_trait;

    use crate::services::{generation_client::Sleeper, progress::PipelineObserver};

    /// Observer that keeps every event for later assertions.
    #[derive(Default)]
    pub struct RecordingObserver {
        progress: Mutex<Vec<(u8, String)>>,
        invalidations: Mutex<u32>,
    }

    impl RecordingObserver {
        pub fn progress_events(&self) -> Vec<(u8, String)> {
            self.progress.lock().expect("observer lock").clone()
        }

        pub fn invalidations(&self) -> u32 {
            *self.invalidations.lock().expect("observer lock")
        }
    }

    impl PipelineObserver for RecordingObserver {
        fn on_progress(&self, percent: u8, message: &str) {
            self.progress
                .lock()
                .expect("observer lock")
                .push((percent, message.to_string()));
        }

        fn on_credential_invalidated(&self) {
            *self.invalidations.lock().expect("observer lock") += 1;
        }
    }

    /// Sleeper that records requested waits and returns immediately.
    #[derive(Default)]
    pub struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn durations(&self) -> Vec<Duration> {
            self.waits.lock().expect("sleeper lock").clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().expect("sleeper lock").push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::fixtures::*;

    #[test]
    fn test_text_of_len_is_exact_and_trimmed() {
        let text = text_of_len(150);
        assert_eq!(text.chars().count(), 150);
        assert_eq!(text.trim(), text);
    }

    #[test]
    fn test_sample_result_is_valid() {
        let result = sample_result(8);
        assert_eq!(result.question_count(), 8);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_gemini_body_shape() {
        let body: serde_json::Value = serde_json::from_str(&gemini_body("hi")).expect("json");
        assert_eq!(body["candidates"][0]["content"]["parts"][0]["text"], "hi");
    }
}
