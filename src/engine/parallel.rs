// src/engine/parallel.rs
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{LineageError, LineageResult, TaskError};
use super::runner::FailurePolicy;
use super::{Executor, TaskOutcome};

/// Executor for running tasks in parallel on a bounded set of blocking workers
#[derive(Debug, Clone)]
pub struct ParallelExecutor {
    worker_count: usize,
    failure_policy: FailurePolicy,
}

impl ParallelExecutor {
    /// Create a new parallel executor
    pub fn new(worker_count: usize, failure_policy: FailurePolicy) -> Self {
        Self {
            worker_count: worker_count.max(1),
            failure_policy,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

#[async_trait]
impl Executor for ParallelExecutor {
    fn name(&self) -> &'static str {
        "parallel"
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
        let total = tasks.len();
        let permits = self.worker_count.min(total).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));
        // Fires on caller cancellation, or on the first failure under fail-fast
        let abort = cancel.child_token();

        debug!("Spawning {} tasks over {} workers", total, permits);

        let mut workers = JoinSet::new();
        for (index, task) in tasks.into_iter().enumerate() {
            let f = Arc::clone(&f);
            let semaphore = Arc::clone(&semaphore);
            let abort = abort.clone();

            workers.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = abort.cancelled() => return (index, None),
                    permit = semaphore.acquire_owned() => permit,
                };
                let Ok(permit) = permit else {
                    return (index, None);
                };
                if abort.is_cancelled() {
                    return (index, None);
                }

                debug!("Executing task {}", index);
                let outcome = match tokio::task::spawn_blocking(move || f(task)).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(TaskError::failed(index, &e)),
                    Err(join_error) => match join_error.try_into_panic() {
                        Ok(payload) => Err(TaskError::panicked(index, payload.as_ref())),
                        Err(join_error) => Err(TaskError {
                            index,
                            message: join_error.to_string(),
                            panicked: false,
                        }),
                    },
                };

                drop(permit);
                (index, Some(outcome))
            });
        }

        let mut slots: Vec<Option<TaskOutcome<R>>> = (0..total).map(|_| None).collect();
        let mut first_failure: Option<TaskError> = None;

        // Drain every worker before returning, whatever happened
        while let Some(joined) = workers.join_next().await {
            let (index, outcome) = match joined {
                Ok(entry) => entry,
                Err(e) => {
                    error!("Worker terminated unexpectedly: {}", e);
                    continue;
                }
            };

            let Some(outcome) = outcome else {
                continue;
            };

            if let Err(task_error) = &outcome {
                warn!("Task {} failed: {}", index, task_error.message);
                if self.failure_policy == FailurePolicy::FailFast && first_failure.is_none() {
                    first_failure = Some(task_error.clone());
                    abort.cancel();
                }
            }

            slots[index] = Some(outcome);
        }

        if let Some(task_error) = first_failure {
            return Err(task_error.into());
        }

        let completed = slots.iter().filter(|slot| slot.is_some()).count();
        if completed < total && cancel.is_cancelled() {
            warn!("Run cancelled after {} of {} tasks", completed, total);
            return Err(LineageError::Cancelled { completed, total });
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| LineageError::UnexpectedError(format!("No result for task {}", index)))
            })
            .collect()
    }
}
