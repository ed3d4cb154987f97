use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

/// Lifecycle state of a processing task.
///
/// `Processing` is the only non-terminal state; a task moves to exactly one
/// of `Completed` or `Failed` and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque task identifier handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// A new, never-before-issued id.
    pub fn new() -> Self {
        TaskId(format!("task_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

/// Snapshot of one task.
///
/// `result` holds the processed object key once completed, or the failure
/// message once failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub result: Option<String>,
}

const FALLBACK_FAILURE: &str = "processing failed without an error message";

/// Thread-safe map of every task the process has started.
///
/// Entries are never evicted for the life of the process.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh id and record it as `Processing`.
    pub fn register(&self) -> Result<TaskId, TaskError> {
        let mut tasks = self.tasks.write().map_err(|_| TaskError::Poisoned)?;
        let mut id = TaskId::new();
        while tasks.contains_key(&id) {
            id = TaskId::new();
        }
        tasks.insert(
            id.clone(),
            TaskRecord {
                id: id.clone(),
                status: TaskStatus::Processing,
                result: None,
            },
        );
        log::debug!("Registered task {id}");
        Ok(id)
    }

    /// Mark a task completed with the key of its processed output.
    pub fn complete(&self, id: &TaskId, result_key: impl Into<String>) -> Result<(), TaskError> {
        self.finish(id, TaskStatus::Completed, result_key.into())
    }

    /// Mark a task failed. An empty message is replaced by a generic one so
    /// a failed task always explains itself.
    pub fn fail(&self, id: &TaskId, message: impl Into<String>) -> Result<(), TaskError> {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = FALLBACK_FAILURE.to_string();
        }
        self.finish(id, TaskStatus::Failed, message)
    }

    fn finish(&self, id: &TaskId, status: TaskStatus, result: String) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().map_err(|_| TaskError::Poisoned)?;
        let record = tasks.get_mut(id).ok_or_else(|| TaskError::NotFound {
            task_id: id.to_string(),
        })?;
        if record.status.is_terminal() {
            return Err(TaskError::AlreadyFinished {
                task_id: id.to_string(),
                status: record.status,
            });
        }
        record.status = status;
        record.result = Some(result);
        Ok(())
    }

    /// Current snapshot of a task.
    pub fn status(&self, id: &TaskId) -> Result<TaskRecord, TaskError> {
        let tasks = self.tasks.read().map_err(|_| TaskError::Poisoned)?;
        tasks.get(id).cloned().ok_or_else(|| TaskError::NotFound {
            task_id: id.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
