use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task execution failed: task {index} - {message}")]
    TaskExecution {
        index: usize,
        message: String,
    },

    #[error("Run cancelled after {completed} of {total} tasks")]
    Cancelled {
        completed: usize,
        total: usize,
    },

    #[error("Directory error: {path:?} - {message}")]
    DirectoryCreation {
        path: PathBuf,
        message: String,
    },

    #[error("Write failed: {path:?} - {message}")]
    WriteFailure {
        path: PathBuf,
        message: String,
    },

    #[error("File error: {path:?} - {message}")]
    FileError {
        path: PathBuf,
        message: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl From<anyhow::Error> for LineageError {
    fn from(error: anyhow::Error) -> Self {
        LineageError::UnexpectedError(format!("{:#}", error))
    }
}

pub type LineageResult<T> = std::result::Result<T, LineageError>;

/// Failure of a single task, kept at the task's index in the result sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task {index} failed: {message}")]
pub struct TaskError {
    pub index: usize,
    pub message: String,
    /// The task function panicked rather than returning an error.
    pub panicked: bool,
}

impl TaskError {
    pub(crate) fn failed(index: usize, error: &anyhow::Error) -> Self {
        Self {
            index,
            message: format!("{:#}", error),
            panicked: false,
        }
    }

    pub(crate) fn panicked(index: usize, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked".to_string()
        };

        Self {
            index,
            message,
            panicked: true,
        }
    }
}

impl From<TaskError> for LineageError {
    fn from(error: TaskError) -> Self {
        LineageError::TaskExecution {
            index: error.index,
            message: error.message,
        }
    }
}
