use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::errors::CredentialError;

pub const API_KEY_STORAGE_KEY: &str = "gemini_api_key";
pub const CLEARED_KEY_STORAGE_KEY: &str = "cleared_api_key_fingerprint";
pub const API_KEY_PREFIX: &str = "AIza";

pub type CredentialResult<T> = Result<T, CredentialError>;

/// Persistence for the generation service API key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn load(&self) -> CredentialResult<Option<SecretString>>;
    async fn store(&self, key: SecretString) -> CredentialResult<()>;
    /// Removes the stored key, remembering its fingerprint.
    async fn clear(&self) -> CredentialResult<()>;
    /// Fingerprint of the most recently cleared key, if any.
    async fn cleared_fingerprint(&self) -> CredentialResult<Option<String>>;
}

/// Prefix check only; the service is the authority on validity.
pub fn validate_api_key_format(key: &str) -> CredentialResult<()> {
    let key = key.trim();
    if key.starts_with(API_KEY_PREFIX) && key.len() > API_KEY_PREFIX.len() {
        Ok(())
    } else {
        Err(CredentialError::InvalidFormat)
    }
}

/// Short SHA-256 fingerprint for logs. The key itself is never logged.
pub fn key_fingerprint(key: &SecretString) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(key.expose_secret().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

/// JSON key-value file shared with other local settings.
pub struct FileCredentialRepository {
    path: PathBuf,
}

impl FileCredentialRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> CredentialResult<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> CredentialResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(map)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialRepository for FileCredentialRepository {
    async fn load(&self) -> CredentialResult<Option<SecretString>> {
        let map = self.read_map().await?;
        Ok(map
            .get(API_KEY_STORAGE_KEY)
            .filter(|k| !k.trim().is_empty())
            .map(|k| SecretString::from(k.clone())))
    }

    async fn store(&self, key: SecretString) -> CredentialResult<()> {
        validate_api_key_format(key.expose_secret())?;

        let mut map = self.read_map().await?;
        map.insert(
            API_KEY_STORAGE_KEY.to_string(),
            key.expose_secret().trim().to_string(),
        );
        map.remove(CLEARED_KEY_STORAGE_KEY);
        self.write_map(&map).await?;

        log::info!("Stored API key {}", key_fingerprint(&key));
        Ok(())
    }

    async fn clear(&self) -> CredentialResult<()> {
        let mut map = self.read_map().await?;
        if let Some(key) = map.remove(API_KEY_STORAGE_KEY) {
            let fingerprint = key_fingerprint(&SecretString::from(key));
            map.insert(CLEARED_KEY_STORAGE_KEY.to_string(), fingerprint.clone());
            self.write_map(&map).await?;
            log::info!("Cleared stored API key {}", fingerprint);
        }
        Ok(())
    }

    async fn cleared_fingerprint(&self) -> CredentialResult<Option<String>> {
        Ok(self.read_map().await?.remove(CLEARED_KEY_STORAGE_KEY))
    }
}

#[derive(Default)]
pub struct InMemoryCredentialRepository {
    key: RwLock<Option<SecretString>>,
    cleared: RwLock<Option<String>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(Some(SecretString::from(key.into()))),
            cleared: RwLock::new(None),
        }
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn load(&self) -> CredentialResult<Option<SecretString>> {
        Ok(self.key.read().await.clone())
    }

    async fn store(&self, key: SecretString) -> CredentialResult<()> {
        validate_api_key_format(key.expose_secret())?;
        *self.key.write().await = Some(key);
        *self.cleared.write().await = None;
        Ok(())
    }

    async fn clear(&self) -> CredentialResult<()> {
        if let Some(key) = self.key.write().await.take() {
            *self.cleared.write().await = Some(key_fingerprint(&key));
        }
        Ok(())
    }

    async fn cleared_fingerprint(&self) -> CredentialResult<Option<String>> {
        Ok(self.cleared.read().await.clone())
    }
}
