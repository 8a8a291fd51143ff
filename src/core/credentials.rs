//! Local persistence for the Nirvana auth token and the model API key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// Errors from the credential store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store cannot be written right now. Callers may log and continue.
    #[error("credential storage unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("invalid API key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    #[must_use]
    pub const fn is_environment_unavailable(&self) -> bool {
        matches!(self, Self::EnvironmentUnavailable(_))
    }
}

/// Persisted credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authtoken: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
}

/// JSON file holding [`Credentials`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    persist_timeout: Duration,
}

impl CredentialStore {
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, persist_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            persist_timeout,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read stored credentials. A missing file is an empty store.
    pub async fn load(&self) -> Result<Credentials, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Credentials::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Credentials::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set_auth_token(&self, token: &str) -> Result<(), StoreError> {
        let token = token.trim().to_string();
        self.update(|c| c.authtoken = Some(token)).await?;
        tracing::info!("auth token stored");
        Ok(())
    }

    /// Store the model API key after checking its shape.
    pub async fn set_api_key(&self, key: &str) -> Result<(), StoreError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(StoreError::InvalidKey("key is empty".to_string()));
        }
        if !key.starts_with("sk-") {
            return Err(StoreError::InvalidKey(
                "OpenAI keys start with 'sk-'".to_string(),
            ));
        }

        let key = key.to_string();
        self.update(|c| c.openai_api_key = Some(key)).await?;
        tracing::info!("API key stored");
        Ok(())
    }

    pub async fn clear_auth_token(&self) -> Result<(), StoreError> {
        self.update(|c| c.authtoken = None).await
    }

    /// Rewrite the store with `change` applied. A corrupt store is replaced.
    async fn update(&self, change: impl FnOnce(&mut Credentials)) -> Result<(), StoreError> {
        let mut credentials = match self.load().await {
            Ok(credentials) => credentials,
            Err(StoreError::Serialization(e)) => {
                tracing::warn!(error = %e, path = %self.path.display(), "replacing corrupt credential store");
                Credentials::default()
            }
            Err(e) => return Err(e),
        };
        change(&mut credentials);
        let contents = serde_json::to_string_pretty(&credentials)?;

        tokio::time::timeout(self.persist_timeout, write_private(&self.path, contents))
            .await
            .map_err(|_| {
                StoreError::EnvironmentUnavailable(format!(
                    "write did not finish within {}s",
                    self.persist_timeout.as_secs()
                ))
            })?
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
                    StoreError::EnvironmentUnavailable(format!(
                        "{}: {e}",
                        self.path.display()
                    ))
                }
                _ => StoreError::Io(e),
            })
    }
}

/// Write `contents` to a private temp file next to `path`, then rename it
/// into place so an interrupted write never leaves a truncated store.
async fn write_private(path: &Path, contents: String) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let staging = path.with_extension("json.tmp");
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&staging).await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&staging, path).await
}
