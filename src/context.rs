// src/context.rs
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::engine::TaskRunner;
use crate::error::LineageResult;
use crate::persist::{ensure_directory, Table, TableWriter};

/// Application context holding the configured runner and writer.
///
/// Build one during start-up and pass it by reference; there is no global instance.
pub struct Context {
    pub config: Config,
    pub runner: TaskRunner,
    pub writer: TableWriter,
}

impl Context {
    /// Create a new application context from an already loaded configuration
    pub fn new(config: Config) -> LineageResult<Self> {
        let runner = TaskRunner::new(config.execution.to_execution_config());
        let writer = TableWriter::new(config.output.writer_config()?);

        Ok(Self {
            config,
            runner,
            writer,
        })
    }

    /// Load the configuration and build the context
    pub fn load(config_path: Option<&Path>) -> LineageResult<Self> {
        let context = Self::new(Config::load(config_path)?)?;
        info!(
            "Context ready: parallel={}, workers={}, output={}",
            context.runner.config().is_parallel(),
            context.runner.config().worker_count(),
            context.output_dir().display()
        );
        Ok(context)
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output.directory
    }

    /// Ensure the configured output directory exists
    pub fn initialize(&self) -> LineageResult<()> {
        ensure_directory(self.output_dir())
    }

    /// Save a table under the configured output directory
    pub fn save_table(&self, table: &Table, filename: &str, comment: &str) -> LineageResult<Option<PathBuf>> {
        self.writer.write(table, self.output_dir(), filename, comment)
    }
}
