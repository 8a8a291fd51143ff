//! Task records as exchanged with the Nirvana API.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The list a task lives in, stored as a numeric `state` on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Inbox,
    Next,
    Waiting,
    Scheduled,
    Someday,
    Trash,
}

impl TaskState {
    /// Lists a new task may be created in.
    pub const ADDABLE: [Self; 5] = [
        Self::Inbox,
        Self::Next,
        Self::Waiting,
        Self::Scheduled,
        Self::Someday,
    ];

    /// Numeric code on the wire.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Inbox => 0,
            Self::Next => 1,
            Self::Waiting => 2,
            Self::Scheduled => 3,
            Self::Someday => 4,
            Self::Trash => 6,
        }
    }

    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Inbox),
            1 => Some(Self::Next),
            2 => Some(Self::Waiting),
            3 => Some(Self::Scheduled),
            4 => Some(Self::Someday),
            6 => Some(Self::Trash),
            _ => None,
        }
    }

    /// Parse a list name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "inbox" => Some(Self::Inbox),
            "next" => Some(Self::Next),
            "waiting" => Some(Self::Waiting),
            "scheduled" => Some(Self::Scheduled),
            "someday" => Some(Self::Someday),
            "trash" => Some(Self::Trash),
            _ => None,
        }
    }

    /// Parse a list name for queries, where `active` means `next`.
    #[must_use]
    pub fn parse_query(name: &str) -> Option<Self> {
        if name.trim().eq_ignore_ascii_case("active") {
            return Some(Self::Next);
        }
        Self::parse(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Next => "next",
            Self::Waiting => "waiting",
            Self::Scheduled => "scheduled",
            Self::Someday => "someday",
            Self::Trash => "trash",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A full task record.
///
/// Only `id` is typed. Every other field stays as the server sent it,
/// nulls and unknown keys included, and is written back untouched on every
/// save; the accessors project the fields the client reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Task {
    /// A complete record for a task that does not exist yet.
    #[must_use]
    pub fn fresh(name: impl Into<String>, note: impl Into<String>, state: TaskState) -> Self {
        let fields = [
            ("type", Value::from(0)),
            ("name", Value::String(name.into())),
            ("note", Value::String(note.into())),
            ("state", Value::from(state.code())),
            ("completed", Value::from(false)),
            ("cancelled", Value::from(false)),
            ("deleted", Value::from(false)),
            ("duedate", Value::from("")),
            ("parentid", Value::from("")),
            ("startdate", Value::from("")),
            ("waitingfor", Value::from("")),
            ("energy", Value::from(0)),
            ("etime", Value::from(0)),
            ("ps", Value::from(0)),
            ("seq", Value::from(1)),
            ("seqp", Value::from(0)),
            ("seqt", Value::from(0)),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fields,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.text("name")
    }

    #[must_use]
    pub fn note(&self) -> &str {
        self.text("note")
    }

    /// Numeric state code; numeric strings are accepted.
    #[must_use]
    pub fn state(&self) -> Option<i64> {
        match self.fields.get("state")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The list this task is in, if its state is one of the known lists.
    #[must_use]
    pub fn list(&self) -> Option<TaskState> {
        self.state().and_then(TaskState::from_code)
    }

    /// Case-insensitive substring match over name and note.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        self.name().to_lowercase().contains(needle) || self.note().to_lowercase().contains(needle)
    }

    /// Apply `patch`, stamping every field it changes.
    pub fn apply(&mut self, patch: &TaskPatch, now: i64) {
        if let Some(name) = &patch.name {
            self.set("name", Value::from(name.as_str()), now);
        }
        if let Some(note) = &patch.note {
            self.set("note", Value::from(note.as_str()), now);
        }
        if let Some(state) = patch.state {
            self.set_state(state, now);
        }
    }

    pub fn set_state(&mut self, state: TaskState, now: i64) {
        self.set("state", Value::from(state.code()), now);
    }

    pub fn mark_completed(&mut self, now: i64) {
        self.set("completed", Value::from(now), now);
    }

    fn text(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Write `field` and bump its modification stamp (`_<field>`) when the
    /// record carries one.
    fn set(&mut self, field: &str, value: Value, now: i64) {
        self.fields.insert(field.to_string(), value);
        if let Some(stamp) = self.fields.get_mut(&format!("_{field}")) {
            *stamp = Value::from(now);
        }
    }
}

/// Fields to change on an existing task. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub note: Option<String>,
    pub state: Option<TaskState>,
}

/// Collect task records from an `everything` response.
///
/// Tasks appear under `results[].task` and in top-level `tasks`/`task`
/// arrays. Records that fail to parse are skipped; a later duplicate of
/// an id replaces the earlier one in place.
#[must_use]
pub fn tasks_from_everything(body: &Value) -> Vec<Task> {
    let mut raw: Vec<&Value> = Vec::new();

    if let Some(results) = body.get("results").and_then(Value::as_array) {
        raw.extend(results.iter().filter_map(|r| r.get("task")));
    }
    for key in ["tasks", "task"] {
        match body.get(key) {
            Some(Value::Array(items)) => raw.extend(items),
            Some(item @ Value::Object(_)) => raw.push(item),
            _ => {}
        }
    }

    let mut tasks: Vec<Task> = Vec::with_capacity(raw.len());
    let mut positions = std::collections::HashMap::new();

    for value in raw {
        match Task::deserialize(value) {
            Ok(task) => {
                if let Some(&at) = positions.get(&task.id) {
                    tasks[at] = task;
                } else {
                    positions.insert(task.id.clone(), tasks.len());
                    tasks.push(task);
                }
            }
            Err(e) => tracing::debug!(error = %e, "skipping malformed task record"),
        }
    }

    tasks
}
