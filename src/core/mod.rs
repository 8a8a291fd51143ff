//! Core business logic shared by the overlay and the one-shot commands.

pub mod cache;
pub mod capture;
pub mod credentials;
mod error;
pub mod nirvana;
pub mod tools;

use std::sync::Arc;

use relay_core::{OpenAiProvider, Relay, SharedSecret};

pub use cache::DataCache;
pub use credentials::{CredentialStore, Credentials, StoreError};
pub use error::{Error, Result};
pub use nirvana::{NirvanaClient, NirvanaError};
pub use tools::TaskTools;

use crate::config::Config;

/// Every long-lived component, built once at startup and shared by reference.
pub struct Services {
    pub config: Config,
    pub credentials: CredentialStore,
    pub auth_token: SharedSecret,
    pub api_key: SharedSecret,
    pub client: Arc<NirvanaClient>,
    pub cache: Arc<DataCache>,
    pub relay: Arc<Relay>,
}

impl Services {
    /// Wire the components around `credentials`.
    ///
    /// Stored credentials are loaded here; an unreadable store is logged
    /// and treated as empty so the user can still log in again.
    pub async fn build(config: Config, credentials: CredentialStore) -> Result<Self> {
        let stored = match credentials.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, path = %credentials.path().display(), "ignoring unreadable credentials");
                Credentials::default()
            }
        };

        let auth_token = SharedSecret::new(stored.authtoken);
        let api_key = SharedSecret::new(config.model.resolve_api_key(stored.openai_api_key));

        let client = Arc::new(NirvanaClient::new(&config.nirvana, auth_token.clone())?);
        let cache = Arc::new(DataCache::new(Arc::clone(&client), config.cache.ttl()));
        let task_tools = Arc::new(TaskTools::new(Arc::clone(&client), Arc::clone(&cache)));

        let provider = OpenAiProvider::new(api_key.clone()).with_base_url(&config.model.base_url);
        let relay = Relay::new(
            Arc::new(provider),
            task_tools,
            config.model.model.clone(),
            tools::SYSTEM_PROMPT,
        )
        .with_limits(config.relay.limits());

        tracing::debug!(
            model = %config.model.model,
            auth_token = ?auth_token,
            api_key = ?api_key,
            "services ready"
        );

        Ok(Self {
            config,
            credentials,
            auth_token,
            api_key,
            client,
            cache,
            relay: Arc::new(relay),
        })
    }
}
