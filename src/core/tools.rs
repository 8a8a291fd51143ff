//! The task operations offered to the model.

use std::sync::Arc;

use async_trait::async_trait;
use relay_core::{Tool, ToolHandler, ToolOutcome};
use serde_json::{Value, json};

use super::cache::DataCache;
use super::nirvana::{NirvanaClient, NirvanaError, Result, Task, TaskPatch, TaskState};

/// Most tasks returned by a single search or listing.
pub const RESULT_LIMIT: usize = 10;

/// Instruction sent ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant integrated into the Nirvana task management app.
You help users manage their tasks through natural language commands.

When users ask to create, update, delete, complete, search, or list tasks, call the appropriate function.
Be concise and helpful. If a task ID is needed but not provided, search for the task first.

Available task lists:
- inbox: New items that haven't been processed
- next: Tasks to do soon
- waiting: Waiting for something/someone
- scheduled: Scheduled for a specific date
- someday: Maybe later";

/// Task operations bound to one account's client and cache.
pub struct TaskTools {
    client: Arc<NirvanaClient>,
    cache: Arc<DataCache>,
}

impl TaskTools {
    #[must_use]
    pub const fn new(client: Arc<NirvanaClient>, cache: Arc<DataCache>) -> Self {
        Self { client, cache }
    }

    async fn add_task(&self, args: &Value) -> Result<Value> {
        let name = required(args, "name")?;
        let note = optional(args, "note").unwrap_or_default();
        let list = match optional(args, "list") {
            Some(list) => parse_list(list, &TaskState::ADDABLE)?,
            None => TaskState::Next,
        };

        self.client.add_task(name, note, list).await?;
        self.refresh().await;
        Ok(Value::from("Task added successfully."))
    }

    async fn update_task(&self, args: &Value) -> Result<Value> {
        let id = required(args, "id")?;
        let state = optional(args, "list")
            .map(|list| parse_list(list, &ALL_LISTS))
            .transpose()?;
        let patch = TaskPatch {
            name: optional(args, "name").map(str::to_string),
            note: optional(args, "note").map(str::to_string),
            state,
            ..TaskPatch::default()
        };

        let task = self.client.update_task(id, &patch).await?;
        self.refresh().await;
        record(&task)
    }

    async fn complete_task(&self, args: &Value) -> Result<Value> {
        let task = self.client.complete(required(args, "id")?).await?;
        self.refresh().await;
        record(&task)
    }

    async fn delete_task(&self, args: &Value) -> Result<Value> {
        let task = self.client.delete_task(required(args, "id")?).await?;
        self.refresh().await;
        record(&task)
    }

    async fn search_tasks(&self, args: &Value) -> Result<Value> {
        let query = required(args, "query")?;
        self.cache.get_data(false).await?;

        let matches = self.cache.search_tasks(query);
        let tasks: Vec<Value> = matches
            .iter()
            .take(RESULT_LIMIT)
            .map(|t| json!({"id": t.id, "name": t.name(), "note": t.note(), "state": t.state()}))
            .collect();

        Ok(json!({"success": true, "count": matches.len(), "tasks": tasks}))
    }

    async fn list_tasks(&self, args: &Value) -> Result<Value> {
        let list = required(args, "list")?;
        let state =
            TaskState::parse_query(list).ok_or_else(|| NirvanaError::InvalidList(list.to_string()))?;
        self.cache.get_data(false).await?;

        let matches = self.cache.tasks_by_state(state);
        let tasks: Vec<Value> = matches
            .iter()
            .take(RESULT_LIMIT)
            .map(|t| json!({"id": t.id, "name": t.name(), "note": t.note()}))
            .collect();

        Ok(json!({"success": true, "count": matches.len(), "tasks": tasks}))
    }

    /// Refetch after a write so searches see it. The write already succeeded,
    /// so a failed refetch is only logged.
    async fn refresh(&self) {
        if let Err(e) = self.cache.get_data(true).await {
            tracing::warn!(error = %e, "cache refresh after write failed");
        }
    }
}

#[async_trait]
impl ToolHandler for TaskTools {
    fn definitions(&self) -> Vec<Tool> {
        definitions()
    }

    async fn call(&self, name: &str, arguments: Value) -> ToolOutcome {
        tracing::debug!(tool = name, "executing task operation");

        let result = match name {
            "add_task" => self.add_task(&arguments).await,
            "update_task" => self.update_task(&arguments).await,
            "complete_task" => self.complete_task(&arguments).await,
            "delete_task" => self.delete_task(&arguments).await,
            "search_tasks" => self.search_tasks(&arguments).await,
            "list_tasks" => self.list_tasks(&arguments).await,
            other => return ToolOutcome::failure(format!("Unknown function: {other}")),
        };

        result.into()
    }
}

const ALL_LISTS: [TaskState; 6] = [
    TaskState::Inbox,
    TaskState::Next,
    TaskState::Waiting,
    TaskState::Scheduled,
    TaskState::Someday,
    TaskState::Trash,
];

fn parse_list(name: &str, allowed: &[TaskState]) -> Result<TaskState> {
    TaskState::parse(name)
        .filter(|state| allowed.contains(state))
        .ok_or_else(|| NirvanaError::InvalidList(name.to_string()))
}

fn required<'a>(args: &'a Value, key: &'static str) -> Result<&'a str> {
    optional(args, key)
        .filter(|value| !value.trim().is_empty())
        .ok_or(NirvanaError::MissingArgument(key))
}

fn optional<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn record(task: &Task) -> Result<Value> {
    serde_json::to_value(task).map_err(|e| NirvanaError::Parse(e.to_string()))
}

fn list_names(lists: &[TaskState]) -> Vec<&'static str> {
    lists.iter().map(|s| s.name()).collect()
}

fn definitions() -> Vec<Tool> {
    let addable = list_names(&TaskState::ADDABLE);
    let all = list_names(&ALL_LISTS);

    vec![
        Tool {
            name: "add_task".to_string(),
            description: "Create a new task in Nirvana. Use this when the user wants to add, create, or make a new task.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "The task name/title"},
                    "note": {"type": "string", "description": "Additional details or notes about the task"},
                    "list": {"type": "string", "enum": addable, "description": "Which list to add the task to. Default is 'next'"}
                },
                "required": ["name"]
            }),
        },
        Tool {
            name: "update_task".to_string(),
            description: "Update an existing task's name, note, or list. Use this when the user wants to modify, edit, or change a task.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "The task ID to update"},
                    "name": {"type": "string", "description": "New task name (optional)"},
                    "note": {"type": "string", "description": "New task note (optional)"},
                    "list": {"type": "string", "enum": all, "description": "Move to a different list (optional)"}
                },
                "required": ["id"]
            }),
        },
        Tool {
            name: "complete_task".to_string(),
            description: "Mark a task as completed. Use this when the user wants to complete, finish, or mark done a task.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"id": {"type": "string", "description": "The task ID to complete"}},
                "required": ["id"]
            }),
        },
        Tool {
            name: "delete_task".to_string(),
            description: "Delete a task (move to trash). Use this when the user wants to delete, remove, or trash a task.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"id": {"type": "string", "description": "The task ID to delete"}},
                "required": ["id"]
            }),
        },
        Tool {
            name: "search_tasks".to_string(),
            description: "Search for tasks by name or note content. Use this when the user wants to find, search, or look for tasks.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"query": {"type": "string", "description": "Search query to find tasks"}},
                "required": ["query"]
            }),
        },
        Tool {
            name: "list_tasks".to_string(),
            description: "List all tasks in a specific list/state. Use this when the user wants to see tasks in a particular list.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "list": {"type": "string", "enum": addable, "description": "Which list to retrieve tasks from"}
                },
                "required": ["list"]
            }),
        },
    ]
}
