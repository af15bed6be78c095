mod parallel;
mod runner;
mod sequential;
mod task;

use std::sync::Arc;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::LineageResult;

pub use parallel::ParallelExecutor;
pub use runner::{ExecutionConfig, FailurePolicy, TaskRunner};
pub use sequential::SequentialExecutor;
pub use task::{load_tasks, save_tasks, TaskDescriptor, TaskOutcome};

/// Strategy for applying a task function to every task of a batch.
///
/// Implementations return exactly one outcome per task, in input order.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn execute<T, R, F>(
        &self,
        f: Arc<F>,
        tasks: Vec<T>,
        cancel: CancellationToken,
    ) -> LineageResult<Vec<TaskOutcome<R>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> anyhow::Result<R> + Send + Sync + 'static;
}
