//! Error types for the core module.

use relay_core::AgentError;

use super::credentials::StoreError;
use super::nirvana::NirvanaError;

/// Core error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration or input error.
    #[error("{0}")]
    Config(String),

    /// Relay or model failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Task API failure.
    #[error(transparent)]
    Nirvana(#[from] NirvanaError),

    /// Credential storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    #[must_use]
    pub fn is_environment_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_environment_unavailable())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
