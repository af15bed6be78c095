// src/engine/task.rs
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{LineageError, LineageResult, TaskError};
use crate::persist::write_atomic;

/// Result of a single task: the function's output, or the failure kept at the task's index.
pub type TaskOutcome<R> = Result<R, TaskError>;

/// Named parameters for one unit of work.
///
/// Descriptors are plain owned data, so they can be moved into a worker without
/// sharing anything with the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskDescriptor {
    params: BTreeMap<String, Value>,
}

impl TaskDescriptor {
    /// Create an empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.params.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Get a parameter converted to `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> LineageResult<T> {
        let value = self.params.get(key)
            .ok_or_else(|| LineageError::InvalidInput(format!("Missing task parameter: {}", key)))?;

        serde_json::from_value(value.clone())
            .map_err(|e| LineageError::SerializationError(format!("Invalid task parameter {}: {}", key, e)))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.params.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TaskDescriptor {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Load tasks from a JSON file
pub fn load_tasks(path: &Path) -> LineageResult<Vec<TaskDescriptor>> {
    debug!("Loading tasks from {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|e| LineageError::FileError {
            path: path.to_path_buf(),
            message: format!("Failed to read file: {}", e),
        })?;

    let tasks: Vec<TaskDescriptor> = serde_json::from_str(&content)
        .map_err(|e| LineageError::SerializationError(format!("Failed to parse JSON: {}", e)))?;

    Ok(tasks)
}

/// Save tasks to a JSON file, replacing any previous file atomically
pub fn save_tasks(tasks: &[TaskDescriptor], path: &Path) -> LineageResult<()> {
    debug!("Saving {} tasks to {}", tasks.len(), path.display());
    let content = serde_json::to_string_pretty(tasks)
        .map_err(|e| LineageError::SerializationError(format!("Failed to serialize tasks: {}", e)))?;

    write_atomic(path, |out: &mut dyn Write| out.write_all(content.as_bytes()))
}
