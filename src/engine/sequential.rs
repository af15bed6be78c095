// src/engine/sequential.rs
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{LineageError, LineageResult, TaskError};
use super::runner::FailurePolicy;
use super::{Executor, TaskOutcome};

/// Executor that runs every task in the caller's context, one at a time, in input order
#[derive(Debug, Clone)]
pub struct SequentialExecutor {
    failure_policy: FailurePolicy,
}

impl SequentialExecutor {
    pub fn new(failure_policy: FailurePolicy) -> Self {
        Self { failure_policy }
    }

    /// Run the batch on the current thread without any async runtime
    pub fn run_inline<T, R, F>(
        &self,
        f: &F,
        tasks: Vec<T>,
        cancel: &CancellationToken,
    ) -> LineageResult<Vec<TaskOutcome<R>>>
    where
        F: Fn(T) -> anyhow::Result<R>,
    {
        let total = tasks.len();
        let mut results = Vec::with_capacity(total);

        for (index, task) in tasks.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Run cancelled after {} of {} tasks", index, total);
                return Err(LineageError::Cancelled { completed: index, total });
            }

            debug!("Executing task {}", index);
            let outcome = match panic::catch_unwind(AssertUnwindSafe(move || f(task))) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(TaskError::failed(index, &e)),
                Err(payload) => Err(TaskError::panicked(index, payload.as_ref())),
            };

            if let Err(task_error) = &outcome {
                warn!("Task {} failed: {}", index, task_error.message);
                if self.failure_policy == FailurePolicy::FailFast {
                    return Err(task_error.clone().into());
                }
            }

            results.push(outcome);
        }

        Ok(results)
    }
}

#[async_trait]
impl Executor for SequentialExecutor {
    fn name(&self) -> &'static str {
        "sequential"
    }

    async fn execute<T, R, F>(
        &self,
        f: Arc<F>,
        tasks: Vec<T>,
        cancel: CancellationToken,
    ) -> LineageResult<Vec<TaskOutcome<R>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.run_inline(f.as_ref(), tasks, &cancel)
    }
}
