//! Time-boxed cache of the full task snapshot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::nirvana::{NirvanaClient, Result, Task, TaskState};

/// The full task list as of one fetch.
#[derive(Debug)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub fetched_at: Instant,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Serves search and listing from the last snapshot until it goes stale.
///
/// Concurrent refreshes are not coalesced; the last one to finish wins.
pub struct DataCache {
    client: Arc<NirvanaClient>,
    ttl: Duration,
    slot: RwLock<Option<Arc<Snapshot>>>,
}

impl DataCache {
    #[must_use]
    pub const fn new(client: Arc<NirvanaClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Return the cached snapshot, fetching a new one when it is missing,
    /// stale or `force` is set.
    pub async fn get_data(&self, force: bool) -> Result<Arc<Snapshot>> {
        if !force {
            if let Some(snapshot) = self.fresh() {
                tracing::debug!(tasks = snapshot.tasks.len(), "using cached snapshot");
                return Ok(snapshot);
            }
        }

        let tasks = self.client.fetch_everything(0).await?;
        let snapshot = Arc::new(Snapshot {
            tasks,
            fetched_at: Instant::now(),
        });
        *self.slot.write() = Some(Arc::clone(&snapshot));

        tracing::debug!(tasks = snapshot.tasks.len(), force, "snapshot refreshed");
        Ok(snapshot)
    }

    fn fresh(&self) -> Option<Arc<Snapshot>> {
        self.slot
            .read()
            .as_ref()
            .filter(|snapshot| snapshot.is_fresh(self.ttl))
            .cloned()
    }

    /// Current snapshot regardless of age.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.slot.read().clone()
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    /// Tasks whose name or note contains `query`, case-insensitively.
    #[must_use]
    pub fn search_tasks(&self, query: &str) -> Vec<Task> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.snapshot()
            .map(|s| s.tasks.iter().filter(|t| t.matches(&needle)).cloned().collect())
            .unwrap_or_default()
    }

    /// Tasks in `state`.
    #[must_use]
    pub fn tasks_by_state(&self, state: TaskState) -> Vec<Task> {
        self.snapshot()
            .map(|s| {
                s.tasks
                    .iter()
                    .filter(|t| t.list() == Some(state))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use relay_core::SharedSecret;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::NirvanaConfig;
    use crate::core::nirvana::NirvanaError;

    async fn server_with_tasks(expected_fetches: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": [
                {"id": "a", "name": "Buy milk", "note": "2 litres", "state": 1},
                {"id": "b", "name": "Call mom", "note": "", "state": 0},
                {"id": "c", "name": "Renew passport", "note": "bring MILK receipt", "state": 4},
                {"id": "d", "name": "Old thing", "state": 6},
            ]})))
            .expect(expected_fetches)
            .mount(&server)
            .await;
        server
    }

    fn cache(server: &MockServer, token: Option<&str>, ttl: Duration) -> DataCache {
        let config = NirvanaConfig {
            base_url: server.uri(),
            ..NirvanaConfig::default()
        };
        let client = NirvanaClient::new(&config, SharedSecret::new(token.map(str::to_string)))
            .unwrap();
        DataCache::new(Arc::new(client), ttl)
    }

    #[tokio::test]
    async fn fresh_snapshot_is_reused() {
        let server = server_with_tasks(1).await;
        let cache = cache(&server, Some("tok"), Duration::from_secs(300));

        let first = cache.get_data(false).await.unwrap();
        let second = cache.get_data(false).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.tasks.len(), 4);
    }

    #[tokio::test]
    async fn force_always_fetches() {
        let server = server_with_tasks(2).await;
        let cache = cache(&server, Some("tok"), Duration::from_secs(300));

        let first = cache.get_data(false).await.unwrap();
        let second = cache.get_data(true).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn stale_snapshot_is_refetched() {
        let server = server_with_tasks(2).await;
        let cache = cache(&server, Some("tok"), Duration::ZERO);

        cache.get_data(false).await.unwrap();
        cache.get_data(false).await.unwrap();
    }

    #[tokio::test]
    async fn clear_drops_snapshot() {
        let server = server_with_tasks(2).await;
        let cache = cache(&server, Some("tok"), Duration::from_secs(300));

        cache.get_data(false).await.unwrap();
        cache.clear();
        assert!(cache.snapshot().is_none());
        cache.get_data(false).await.unwrap();
    }

    #[tokio::test]
    async fn missing_token_fails_without_request() {
        let server = server_with_tasks(0).await;
        let cache = cache(&server, None, Duration::from_secs(300));

        assert!(matches!(cache.get_data(false).await, Err(NirvanaError::TokenMissing)));
    }

    #[tokio::test]
    async fn search_covers_name_and_note() {
        let server = server_with_tasks(1).await;
        let cache = cache(&server, Some("tok"), Duration::from_secs(300));
        cache.get_data(false).await.unwrap();

        let ids: Vec<_> = cache.search_tasks("milk").into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["a", "c"]);
        assert!(cache.search_tasks("   ").is_empty());
        assert!(cache.search_tasks("dentist").is_empty());
    }

    #[tokio::test]
    async fn filters_by_state() {
        let server = server_with_tasks(1).await;
        let cache = cache(&server, Some("tok"), Duration::from_secs(300));

        assert!(cache.tasks_by_state(TaskState::Next).is_empty());
        cache.get_data(false).await.unwrap();

        let next: Vec<_> = cache
            .tasks_by_state(TaskState::Next)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(next, ["a"]);
        assert_eq!(cache.tasks_by_state(TaskState::Trash).len(), 1);
        assert!(cache.tasks_by_state(TaskState::Waiting).is_empty());
    }
}
