use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};

use crate::{config::Config, errors::TransportError, models::dto::GeminiRequest};

/// Status and raw body of one HTTP exchange. Classification of the status is
/// left to the generation client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn post(
        &self,
        model: &str,
        api_key: &SecretString,
        body: &GeminiRequest,
    ) -> Result<TransportResponse, TransportError>;
}

/// Calls the Gemini `generateContent` endpoint.
pub struct GeminiHttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiHttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(config.gemini_base_url.clone(), config.request_timeout)
    }

    pub fn endpoint(&self, model: &str) -> String {
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };
        format!("{}{}:generateContent", base, model)
    }
}

#[async_trait]
impl GenerationTransport for GeminiHttpTransport {
    async fn post(
        &self,
        model: &str,
        api_key: &SecretString,
        body: &GeminiRequest,
    ) -> Result<TransportResponse, TransportError> {
        let res = self
            .client
            .post(self.endpoint(model))
            .header(USER_AGENT, concat!("eejaz/", env!("CARGO_PKG_VERSION")))
            .header(CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res.text().await?;

        log::debug!("POST {} -> {} ({} bytes)", model, status, body.len());

        Ok(TransportResponse { status, body })
    }
}
