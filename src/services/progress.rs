use crate::{constants::messages::Milestone, models::domain::Language};

/// Sink for progress and credential events, implemented by the presentation layer.
pub trait PipelineObserver: Send + Sync {
    fn on_progress(&self, percent: u8, message: &str);

    /// The stored credential was rejected or is missing; the user should be
    /// asked for a new one.
    fn on_credential_invalidated(&self) {}
}

pub fn report(observer: &dyn PipelineObserver, milestone: Milestone, lang: Language) {
    observer.on_progress(milestone.percent(), &milestone.message(lang));
}
