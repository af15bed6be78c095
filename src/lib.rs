pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod persist;
pub mod telemetry;

// Re-export main types for easier access
pub use crate::config::Config;
pub use context::Context;
pub use engine::{
    ExecutionConfig,
    FailurePolicy,
    TaskDescriptor,
    TaskOutcome,
    TaskRunner
};
pub use error::{LineageError, LineageResult, TaskError};
pub use persist::{
    ensure_directory,
    Cell,
    Table,
    TableWriter
};
