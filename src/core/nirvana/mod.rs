//! Client for the NirvanaHQ task API.
//!
//! Every request goes to the single `everything` endpoint: reads are a
//! `GET` of the full account state since an epoch, writes are a `POST` of
//! `task.save` commands. Saves always carry the complete record, so every
//! mutation reads the current record first and writes it back with only
//! the requested fields changed. Mutations of one task are serialized so
//! concurrent changes never overwrite each other.

mod task;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relay_core::SharedSecret;
use relay_core::secret::mask_secrets;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;

use crate::config::NirvanaConfig;

pub use task::{Task, TaskPatch, TaskState, tasks_from_everything};

/// Errors from the task API.
#[derive(Debug, thiserror::Error)]
pub enum NirvanaError {
    #[error("Nirvana auth token not set. Log in to Nirvana and run `spotlight auth token`.")]
    TokenMissing,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("unknown list '{0}'. Use one of: inbox, next, waiting, scheduled, someday")]
    InvalidList(String),

    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),
}

pub type Result<T> = std::result::Result<T, NirvanaError>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct SaveCommand<'a> {
    method: &'static str,
    #[serde(flatten)]
    task: &'a Task,
}

/// HTTP client for one Nirvana account.
pub struct NirvanaClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_version: String,
    token: SharedSecret,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl NirvanaClient {
    /// Create a client that reads the auth token from `token` on every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &NirvanaConfig, token: SharedSecret) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            app_version: config.app_version.clone(),
            token,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Build an authenticated URL for `endpoint`.
    ///
    /// Each call stamps the current time and a new request id; entries in
    /// `params` override the defaults.
    pub fn build_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url> {
        let token = self.token.get().ok_or(NirvanaError::TokenMissing)?;
        let now = now().to_string();

        let mut query: Vec<(&str, String)> = vec![
            ("authtoken", token),
            ("appid", self.app_id.clone()),
            ("appversion", self.app_version.clone()),
            ("clienttime", now.clone()),
            ("servertime", now),
            ("requestid", uuid::Uuid::new_v4().to_string()),
        ];
        for (key, value) in params {
            if let Some(slot) = query.iter_mut().find(|(k, _)| *k == *key) {
                slot.1.clone_from(value);
            } else {
                query.push((*key, value.clone()));
            }
        }

        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        Url::parse_with_params(&url, &query)
            .map_err(|e| NirvanaError::Parse(format!("invalid URL {url}: {e}")))
    }

    /// Fetch the full account state changed since `since` (epoch seconds).
    pub async fn fetch_everything(&self, since: i64) -> Result<Vec<Task>> {
        let url = self.build_url(
            "everything",
            &[("return", "everything".to_string()), ("since", since.to_string())],
        )?;
        tracing::debug!(url = %mask_secrets(url.as_str()), "fetching everything");

        let response = self.http.get(url).send().await?;
        let body = read_json(response).await?;
        let tasks = tasks_from_everything(&body);

        tracing::debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    /// Fetch a single task by id.
    pub async fn get_task(&self, id: &str) -> Result<Task> {
        self.fetch_everything(0)
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| NirvanaError::NotFound(id.to_string()))
    }

    /// Create a task in `list`.
    pub async fn add_task(&self, name: &str, note: &str, list: TaskState) -> Result<Task> {
        let task = Task::fresh(name, note, list);
        self.save(std::slice::from_ref(&task)).await?;

        tracing::info!(id = %task.id, list = %list, "task added");
        Ok(task)
    }

    /// Change the fields named in `patch`, keeping everything else.
    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        self.modify(id, |task, now| task.apply(patch, now)).await
    }

    /// Move a task to another list.
    pub async fn set_state(&self, id: &str, state: TaskState) -> Result<Task> {
        self.modify(id, |task, now| task.set_state(state, now)).await
    }

    /// Mark a task completed now.
    pub async fn complete(&self, id: &str) -> Result<Task> {
        self.modify(id, Task::mark_completed).await
    }

    /// Move a task to the trash.
    pub async fn delete_task(&self, id: &str) -> Result<Task> {
        self.set_state(id, TaskState::Trash).await
    }

    /// Read, change and save one task while holding its lock.
    async fn modify(&self, id: &str, change: impl FnOnce(&mut Task, i64)) -> Result<Task> {
        let lock = self.task_lock(id);
        let _guard = lock.lock().await;

        let mut task = self.get_task(id).await?;
        change(&mut task, now());
        self.save(std::slice::from_ref(&task)).await?;

        tracing::info!(id = %task.id, state = ?task.state(), "task saved");
        Ok(task)
    }

    fn task_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(id.to_string()).or_default())
    }

    /// Submit full records as `task.save` commands.
    pub async fn save(&self, tasks: &[Task]) -> Result<Value> {
        let url = self.build_url(
            "everything",
            &[
                ("return", "everything".to_string()),
                ("since", (now() - 1).to_string()),
            ],
        )?;
        let commands: Vec<_> = tasks
            .iter()
            .map(|task| SaveCommand {
                method: "task.save",
                task,
            })
            .collect();

        tracing::debug!(url = %mask_secrets(url.as_str()), count = tasks.len(), "saving tasks");

        let response = self.http.post(url).json(&commands).send().await?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NirvanaError::Status {
            status: status.as_u16(),
            message: status_message(status, &body),
        });
    }

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| NirvanaError::Parse(e.to_string()))
}

fn status_message(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("error");
    let body = body.trim();
    if body.is_empty() {
        reason.to_string()
    } else {
        format!("{reason} Body: {}", mask_secrets(body))
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
