// src/engine/runner.rs
use std::sync::Arc;
use std::time::Instant;
use serde::{Serialize, Deserialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, error};

use crate::error::{LineageError, LineageResult};
use super::{Executor, ParallelExecutor, SequentialExecutor, TaskOutcome};

/// What happens to the rest of a batch when one task fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure at the task's index and keep running the other tasks
    #[default]
    Isolate,
    /// Stop starting new tasks after the first failure and return it as the run's error
    FailFast,
}

/// Immutable execution settings for a [`TaskRunner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    parallel: bool,
    worker_count: usize,
    failure_policy: FailurePolicy,
}

impl ExecutionConfig {
    /// Worker counts below one are clamped to one
    pub fn new(parallel: bool, worker_count: usize) -> Self {
        if worker_count == 0 {
            warn!("Worker count must be at least 1, using 1");
        }

        Self {
            parallel,
            worker_count: worker_count.max(1),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Parallel execution with one worker per available CPU
    pub fn parallel() -> Self {
        Self::new(true, num_cpus::get())
    }

    pub fn sequential() -> Self {
        Self::new(false, 1)
    }

    pub fn with_failure_policy(self, failure_policy: FailurePolicy) -> Self {
        Self { failure_policy, ..self }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::parallel()
    }
}

enum Mode {
    Parallel(ParallelExecutor),
    Sequential(SequentialExecutor),
}

/// Applies one task function to every task of a batch and returns the outcomes in input order.
///
/// The executor is chosen once from the [`ExecutionConfig`]; calling code does not
/// change between parallel and sequential execution.
pub struct TaskRunner {
    config: ExecutionConfig,
    mode: Mode,
}

impl TaskRunner {
    pub fn new(config: ExecutionConfig) -> Self {
        let mode = if config.parallel {
            Mode::Parallel(ParallelExecutor::new(config.worker_count, config.failure_policy))
        } else {
            Mode::Sequential(SequentialExecutor::new(config.failure_policy))
        };

        Self { config, mode }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run `f` over `tasks`.
    ///
    /// Returns one outcome per task, index for index. Under [`FailurePolicy::Isolate`]
    /// failures appear as `Err` entries; under [`FailurePolicy::FailFast`] the first
    /// failure is returned as [`LineageError::TaskExecution`].
    pub async fn run<T, R, F>(&self, f: F, tasks: Vec<T>) -> LineageResult<Vec<TaskOutcome<R>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.run_with_cancel(f, tasks, CancellationToken::new()).await
    }

    /// Run `f` over `tasks`, skipping tasks that have not started once `cancel` fires.
    ///
    /// Tasks already executing are awaited before this returns [`LineageError::Cancelled`].
    pub async fn run_with_cancel<T, R, F>(
        &self,
        f: F,
        tasks: Vec<T>,
        cancel: CancellationToken,
    ) -> LineageResult<Vec<TaskOutcome<R>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        if tasks.is_empty() {
            info!("No tasks to execute");
            return Ok(Vec::new());
        }

        let total = tasks.len();
        let started = Instant::now();
        let f = Arc::new(f);

        let result = match &self.mode {
            Mode::Parallel(executor) => {
                self.log_start(executor.name(), total);
                executor.execute(f, tasks, cancel).await
            }
            Mode::Sequential(executor) => {
                self.log_start(executor.name(), total);
                executor.execute(f, tasks, cancel).await
            }
        };

        Self::log_finish(&result, started);
        result
    }

    /// Blocking variant of [`TaskRunner::run`] for callers outside an async runtime.
    ///
    /// Sequential mode calls `f` directly on the calling thread. Parallel mode starts a
    /// runtime whose blocking pool is capped at `worker_count` threads, for this call
    /// only, and shuts it down before returning.
    pub fn run_blocking<T, R, F>(&self, f: F, tasks: Vec<T>) -> LineageResult<Vec<TaskOutcome<R>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        if tasks.is_empty() {
            info!("No tasks to execute");
            return Ok(Vec::new());
        }

        let total = tasks.len();
        let started = Instant::now();

        let result = match &self.mode {
            Mode::Sequential(executor) => {
                self.log_start(executor.name(), total);
                executor.run_inline(&f, tasks, &CancellationToken::new())
            }
            Mode::Parallel(executor) => {
                if tokio::runtime::Handle::try_current().is_ok() {
                    return Err(LineageError::ConfigError(
                        "run_blocking cannot start a worker pool inside an async runtime; use run".to_string(),
                    ));
                }

                let workers = executor.worker_count().min(total);
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .max_blocking_threads(workers)
                    .thread_name("lineage-worker")
                    .enable_all()
                    .build()
                    .map_err(|e| LineageError::UnexpectedError(format!("Failed to start worker pool: {}", e)))?;

                self.log_start(executor.name(), total);
                let result = runtime.block_on(executor.execute(Arc::new(f), tasks, CancellationToken::new()));

                // Joins the blocking workers
                drop(runtime);
                result
            }
        };

        Self::log_finish(&result, started);
        result
    }

    fn log_start(&self, mode: &str, total: usize) {
        info!(
            "Executing {} tasks ({} mode, {} workers, {:?} on failure)",
            total,
            mode,
            if self.config.parallel { self.config.worker_count } else { 1 },
            self.config.failure_policy
        );
    }

    fn log_finish<R>(result: &LineageResult<Vec<TaskOutcome<R>>>, started: Instant) {
        match result {
            Ok(outcomes) => {
                let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
                info!(
                    "Completed {} tasks in {:?} ({} failed)",
                    outcomes.len(),
                    started.elapsed(),
                    failed
                );
            }
            Err(e) => error!("Task run aborted: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::engine::TaskDescriptor;
    use crate::error::TaskError;

    fn square(task: TaskDescriptor) -> anyhow::Result<i64> {
        let n: i64 = task.get_as("n")?;
        Ok(n * n)
    }

    fn tasks(count: i64) -> Vec<TaskDescriptor> {
        (0..count).map(|n| TaskDescriptor::new().with("n", n)).collect()
    }

    fn values(outcomes: Vec<TaskOutcome<i64>>) -> Vec<i64> {
        outcomes.into_iter().map(|outcome| outcome.unwrap()).collect()
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let config = ExecutionConfig::new(true, 0);
        assert_eq!(config.worker_count(), 1);
        assert!(ExecutionConfig::default().worker_count() >= 1);
        assert!(ExecutionConfig::default().is_parallel());
        assert!(!ExecutionConfig::sequential().is_parallel());
    }

    #[tokio::test]
    async fn test_order_preserved_in_both_modes() {
        let expected: Vec<i64> = (0..50).map(|n| n * n).collect();

        let parallel = TaskRunner::new(ExecutionConfig::new(true, 4));
        let sequential = TaskRunner::new(ExecutionConfig::sequential());

        let from_parallel = values(parallel.run(square, tasks(50)).await.unwrap());
        let from_sequential = values(sequential.run(square, tasks(50)).await.unwrap());

        assert_eq!(from_parallel, expected);
        assert_eq!(from_sequential, from_parallel);
    }

    #[tokio::test]
    async fn test_empty_input_never_calls_function() {
        let calls = Arc::new(AtomicUsize::new(0));
        for config in [ExecutionConfig::new(true, 8), ExecutionConfig::sequential()] {
            let runner = TaskRunner::new(config);
            let counter = Arc::clone(&calls);
            let results = runner
                .run(
                    move |task: TaskDescriptor| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        square(task)
                    },
                    Vec::new(),
                )
                .await
                .unwrap();
            assert!(results.is_empty());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_isolate_keeps_failures_in_place() {
        let bad = tasks(6)
            .into_iter()
            .enumerate()
            .map(|(i, task)| if i == 2 { task.with("n", "two") } else { task })
            .collect::<Vec<_>>();

        for config in [ExecutionConfig::new(true, 3), ExecutionConfig::sequential()] {
            let runner = TaskRunner::new(config);
            let results = runner.run(square, bad.clone()).await.unwrap();

            assert_eq!(results.len(), 6);
            assert_eq!(results[1], Ok(1));
            assert_eq!(results[3], Ok(9));
            let failure = results[2].clone().unwrap_err();
            assert_eq!(failure.index, 2);
            assert!(failure.message.contains("Invalid task parameter n"));
        }
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_run() {
        let runner = TaskRunner::new(ExecutionConfig::new(true, 2).with_failure_policy(FailurePolicy::FailFast));
        let result = runner
            .run(
                |n: usize| -> anyhow::Result<usize> {
                    if n == 3 {
                        anyhow::bail!("task {} rejected", n);
                    }
                    Ok(n)
                },
                (0..10).collect(),
            )
            .await;

        match result {
            Err(LineageError::TaskExecution { index, message }) => {
                assert_eq!(index, 3);
                assert_eq!(message, "task 3 rejected");
            }
            other => panic!("expected task failure, got {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn test_panics_become_task_errors() {
        for config in [ExecutionConfig::new(true, 2), ExecutionConfig::sequential()] {
            let runner = TaskRunner::new(config);
            let results = runner
                .run(
                    |n: usize| -> anyhow::Result<usize> {
                        if n == 1 {
                            panic!("worker blew up");
                        }
                        Ok(n)
                    },
                    vec![0, 1, 2],
                )
                .await
                .unwrap();

            assert_eq!(results[0], Ok(0));
            assert_eq!(
                results[1],
                Err(TaskError { index: 1, message: "worker blew up".to_string(), panicked: true })
            );
            assert_eq!(results[2], Ok(2));
        }
    }

    #[test]
    fn test_run_blocking_outside_runtime() {
        let parallel = TaskRunner::new(ExecutionConfig::new(true, 3));
        let sequential = TaskRunner::new(ExecutionConfig::sequential());

        let a = values(parallel.run_blocking(square, tasks(20)).unwrap());
        let b = values(sequential.run_blocking(square, tasks(20)).unwrap());

        assert_eq!(a, b);
        assert_eq!(a[19], 361);
    }

    #[tokio::test]
    async fn test_run_blocking_inside_runtime_is_rejected() {
        let runner = TaskRunner::new(ExecutionConfig::new(true, 2));
        let result = runner.run_blocking(square, tasks(2));
        assert!(matches!(result, Err(LineageError::ConfigError(_))));

        // Sequential mode needs no pool, so it works anywhere
        let runner = TaskRunner::new(ExecutionConfig::sequential());
        assert_eq!(values(runner.run_blocking(square, tasks(2)).unwrap()), vec![0, 1]);
    }
}
