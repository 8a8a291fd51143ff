//! Relay error types.

use std::time::Duration;

/// Relay and provider errors.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// API key not configured.
    #[error("OpenAI API key not configured. Set it with /setkey or `spotlight auth key`.")]
    ApiKeyMissing,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse API response.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// The model kept requesting tools past the round limit.
    #[error("loop detected: {0}")]
    LoopDetected(String),

    /// The turn exceeded its wall-clock budget.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_seconds() {
        let err = AgentError::Timeout(Duration::from_secs(120));
        assert_eq!(err.to_string(), "request timed out after 120s");
    }
}
