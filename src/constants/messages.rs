use crate::models::domain::Language;

/// Coarse pipeline milestones reported to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    Reading,
    Ocr { page: u32, total: u32 },
    Analysing,
    Generating,
    RateLimited { round: u32, rounds: u32 },
    Complete,
}

impl Milestone {
    pub fn percent(&self) -> u8 {
        match self {
            Milestone::Reading => 10,
            Milestone::Ocr { page, total } => {
                let total = (*total).max(1);
                let done = (*page).min(total);
                (15 + done * 20 / total) as u8
            }
            Milestone::Analysing => 40,
            Milestone::Generating | Milestone::RateLimited { .. } => 60,
            Milestone::Complete => 100,
        }
    }

    pub fn message(&self, lang: Language) -> String {
        match (self, lang) {
            (Milestone::Reading, Language::Ar) => "جاري قراءة الملف...".to_string(),
            (Milestone::Reading, Language::En) => "Reading the file...".to_string(),
            (Milestone::Ocr { page, total }, Language::Ar) => {
                format!("التعرف الضوئي على الصفحة {} من {}...", page, total)
            }
            (Milestone::Ocr { page, total }, Language::En) => {
                format!("Recognizing page {} of {}...", page, total)
            }
            (Milestone::Analysing, Language::Ar) => "تحليل النص بالذكاء الاصطناعي...".to_string(),
            (Milestone::Analysing, Language::En) => "Analysing the text...".to_string(),
            (Milestone::Generating, Language::Ar) => "توليد الأسئلة والملخص الشامل...".to_string(),
            (Milestone::Generating, Language::En) => {
                "Generating the summary and questions...".to_string()
            }
            (Milestone::RateLimited { round, rounds }, Language::Ar) => {
                format!("زحام في الطلبات... محاولة {} من {}", round, rounds)
            }
            (Milestone::RateLimited { round, rounds }, Language::En) => {
                format!("Service busy... attempt {} of {}", round, rounds)
            }
            (Milestone::Complete, Language::Ar) => "تم الانتهاء!".to_string(),
            (Milestone::Complete, Language::En) => "Done!".to_string(),
        }
    }
}
