use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned by the storage layer when a todo is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(Uuid);

impl TodoId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for TodoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn was_edited(&self) -> bool {
        self.updated_at != self.created_at
    }
}

/// Already-sanitized input for a new todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub text: String,
}

/// Already-sanitized field replacements for an existing todo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoCounts {
    pub total: u64,
    pub completed: u64,
}

impl TodoCounts {
    pub fn pending(&self) -> u64 {
        self.total.saturating_sub(self.completed)
    }
}

/// Summary shown next to the list and served by `GET /api/todos/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    /// Whole percent, rounded half away from zero; 0 for an empty list.
    pub completion_rate: u32,
}

impl TodoStats {
    pub fn of(todos: &[Todo]) -> Self {
        let completed = todos.iter().filter(|t| t.completed).count() as u64;
        TodoCounts { total: todos.len() as u64, completed }.into()
    }
}

impl From<TodoCounts> for TodoStats {
    fn from(counts: TodoCounts) -> Self {
        let completion_rate = if counts.total == 0 {
            0
        } else {
            let ratio = counts.completed.min(counts.total) as f64 / counts.total as f64;
            (ratio * 100.0).round() as u32
        };
        Self {
            total: counts.total,
            completed: counts.completed,
            pending: counts.pending(),
            completion_rate,
        }
    }
}
