use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    config::{Config, RateLimitPolicy},
    constants::messages::Milestone,
    errors::{AttemptFailure, PipelineError, PipelineResult},
    models::{
        domain::{GenerationRequest, GenerationResult},
        dto::GeminiResponse,
    },
    repositories::{credential_repository::key_fingerprint, CredentialRepository},
    services::{
        progress::{report, PipelineObserver},
        prompt_builder::request_body,
        response_parser::parse_generation_result,
        transport::{GenerationTransport, TransportResponse},
    },
};

// Keeps error bodies in logs and messages readable.
const ERROR_BODY_SNIPPET: usize = 300;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Result of one attempt against one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(GenerationResult),
    Retryable(AttemptFailure),
    Fatal(AttemptFailure),
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub models: Vec<String>,
    pub rounds: u32,
    pub backoff_unit: Duration,
    pub round_pause: Duration,
    pub policy: RateLimitPolicy,
}

impl RetrySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            models: config.model_candidates.clone(),
            rounds: config.retry_rounds,
            backoff_unit: config.rate_limit_backoff,
            round_pause: config.round_pause,
            policy: config.rate_limit_policy,
        }
    }

    /// Wait after a 429 in zero-based `round`: grows linearly per round.
    pub fn backoff_for_round(&self, round: u32) -> Duration {
        self.backoff_unit * (round + 1)
    }
}

/// Maps one HTTP exchange onto an attempt outcome.
pub fn classify_response(model: &str, response: &TransportResponse) -> AttemptOutcome {
    match response.status {
        401 | 403 => AttemptOutcome::Fatal(AttemptFailure::AuthInvalid),
        429 => AttemptOutcome::Retryable(AttemptFailure::RateLimited(model.to_string())),
        200..=299 => {
            let parsed = serde_json::from_str::<GeminiResponse>(&response.body)
                .map_err(|e| format!("unexpected response envelope: {}", e))
                .and_then(|envelope| envelope.first_text().map(str::to_string))
                .and_then(|text| parse_generation_result(&text));

            match parsed {
                Ok(result) => AttemptOutcome::Success(result),
                Err(reason) => AttemptOutcome::Retryable(AttemptFailure::MalformedResponse(reason)),
            }
        }
        status => AttemptOutcome::Retryable(AttemptFailure::HttpStatus {
            model: model.to_string(),
            status,
            body: response.body.chars().take(ERROR_BODY_SNIPPET).collect(),
        }),
    }
}

/// Calls the ordered model candidates over several rounds until one returns
/// a valid result.
pub struct GenerationClient {
    transport: Arc<dyn GenerationTransport>,
    credentials: Arc<dyn CredentialRepository>,
    sleeper: Arc<dyn Sleeper>,
    settings: RetrySettings,
}

impl GenerationClient {
    pub fn new(
        transport: Arc<dyn GenerationTransport>,
        credentials: Arc<dyn CredentialRepository>,
        sleeper: Arc<dyn Sleeper>,
        settings: RetrySettings,
    ) -> Self {
        Self {
            transport,
            credentials,
            sleeper,
            settings,
        }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        observer: &dyn PipelineObserver,
    ) -> PipelineResult<GenerationResult> {
        let api_key = match self.credentials.load().await {
            Ok(Some(key)) => key,
            Ok(None) => {
                log::warn!("No API key stored; generation skipped");
                observer.on_credential_invalidated();
                return Err(auth_failure(0));
            }
            Err(e) => {
                log::error!("Failed to load API key: {}", e);
                observer.on_credential_invalidated();
                return Err(auth_failure(0));
            }
        };

        let body = request_body(request);
        let lang = request.language();
        let rounds = self.settings.rounds;
        let mut skipped: HashSet<&str> = HashSet::new();
        let mut attempts = 0u32;
        let mut last_failure: Option<AttemptFailure> = None;

        log::info!(
            "Generating {} questions with key {} across {} models",
            request.question_count(),
            key_fingerprint(&api_key),
            self.settings.models.len()
        );

        'rounds: for round in 0..rounds {
            for model in &self.settings.models {
                if skipped.contains(model.as_str()) {
                    continue;
                }

                attempts += 1;
                let outcome = match self.transport.post(model, &api_key, &body).await {
                    Ok(response) => classify_response(model, &response),
                    Err(e) => AttemptOutcome::Retryable(AttemptFailure::Transport(e.to_string())),
                };

                match outcome {
                    AttemptOutcome::Success(result) => {
                        log::info!(
                            "Model {} returned {} questions (round {}, attempt {})",
                            model,
                            result.question_count(),
                            round + 1,
                            attempts
                        );
                        return Ok(result);
                    }
                    AttemptOutcome::Fatal(failure) => {
                        log::error!("Model {} rejected the API key", model);
                        if let Err(e) = self.credentials.clear().await {
                            log::error!("Failed to clear rejected API key: {}", e);
                        }
                        observer.on_credential_invalidated();
                        return Err(PipelineError::GenerationFailure {
                            cause: failure,
                            attempts,
                        });
                    }
                    AttemptOutcome::Retryable(failure) => {
                        if let AttemptFailure::RateLimited(_) = failure {
                            let wait = self.settings.backoff_for_round(round);
                            log::warn!(
                                "Model {} rate limited in round {}; waiting {:?}",
                                model,
                                round + 1,
                                wait
                            );
                            report(
                                observer,
                                Milestone::RateLimited {
                                    round: round + 1,
                                    rounds,
                                },
                                lang,
                            );
                            self.sleeper.sleep(wait).await;
                            if self.settings.policy == RateLimitPolicy::SkipAfterRateLimit {
                                skipped.insert(model.as_str());
                            }
                        } else {
                            log::warn!("Model {} failed: {}", model, failure);
                        }
                        last_failure = Some(failure);
                    }
                }
            }

            if skipped.len() == self.settings.models.len() {
                log::warn!("Every model candidate is rate limited; giving up");
                break 'rounds;
            }
            if round + 1 < rounds {
                self.sleeper.sleep(self.settings.round_pause).await;
            }
        }

        let cause = last_failure.unwrap_or_else(|| {
            AttemptFailure::Transport("no model candidates were attempted".to_string())
        });
        log::error!("Generation failed after {} attempts: {}", attempts, cause);

        Err(PipelineError::GenerationFailure { cause, attempts })
    }
}

fn auth_failure(attempts: u32) -> PipelineError {
    PipelineError::GenerationFailure {
        cause: AttemptFailure::AuthInvalid,
        attempts,
    }
}
