use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::{
    config::Config,
    errors::{ConfigError, CredentialError},
    repositories::{
        credential_repository::{key_fingerprint, validate_api_key_format},
        CredentialRepository, FileCredentialRepository,
    },
    services::{
        GeminiHttpTransport, GenerationClient, OcrEngine, PipelineOrchestrator, RetrySettings,
        TextExtractor, TokioSleeper,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialRepository>,
}

impl AppState {
    /// Validates the configuration and seeds an empty credential store from
    /// `GEMINI_API_KEY`. A stored key wins, and a configured key that was
    /// cleared after the service rejected it is not seeded again.
    pub async fn new(config: Config) -> Result<Self, ConfigError> {
        let credentials: Arc<dyn CredentialRepository> =
            Arc::new(FileCredentialRepository::new(config.credential_store_path.clone()));
        Self::with_credentials(config, credentials).await
    }

    pub async fn with_credentials(
        config: Config,
        credentials: Arc<dyn CredentialRepository>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        if let Some(key) = &config.gemini_api_key {
            Self::seed_key(credentials.as_ref(), key).await?;
        }

        Ok(Self {
            config: Arc::new(config),
            credentials,
        })
    }

    async fn seed_key(
        credentials: &dyn CredentialRepository,
        key: &SecretString,
    ) -> Result<(), ConfigError> {
        validate_api_key_format(key.expose_secret()).map_err(|_| {
            ConfigError::Invalid("GEMINI_API_KEY does not look like a Gemini API key".to_string())
        })?;

        if credentials.load().await.map_err(storage_error)?.is_some() {
            log::debug!("Using the stored API key instead of GEMINI_API_KEY");
            return Ok(());
        }

        let fingerprint = key_fingerprint(key);
        if credentials.cleared_fingerprint().await.map_err(storage_error)? == Some(fingerprint.clone()) {
            log::warn!(
                "GEMINI_API_KEY ({}) was rejected earlier; provide a new key with --api-key",
                fingerprint
            );
            return Ok(());
        }

        credentials
            .store(SecretString::from(key.expose_secret().to_string()))
            .await
            .map_err(storage_error)
    }

    /// Wires a fresh orchestrator, with its own session, from this state.
    pub fn orchestrator(&self) -> Result<PipelineOrchestrator, ConfigError> {
        let transport = GeminiHttpTransport::from_config(&self.config)
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        let client = GenerationClient::new(
            Arc::new(transport),
            self.credentials.clone(),
            Arc::new(TokioSleeper),
            RetrySettings::from_config(&self.config),
        );

        Ok(PipelineOrchestrator::new(
            TextExtractor::new(self.config.max_native_pages),
            OcrEngine::from_config(&self.config),
            client,
        ))
    }
}

fn storage_error(err: CredentialError) -> ConfigError {
    ConfigError::Invalid(err.to_string())
}
