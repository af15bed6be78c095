use serde::{Serialize, Deserialize};
use std::path::PathBuf;

use crate::engine::{ExecutionConfig, FailurePolicy};
use crate::error::{LineageError, LineageResult};
use crate::persist::WriterConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub execution: ExecutionSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

/// Task execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    // None means one worker per CPU
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<usize>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_parallel() -> bool {
    true
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            worker_count: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ExecutionSettings {
    pub fn to_execution_config(&self) -> ExecutionConfig {
        let worker_count = self.worker_count.unwrap_or_else(num_cpus::get);
        ExecutionConfig::new(self.parallel, worker_count).with_failure_policy(self.failure_policy)
    }
}

/// Table output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            delimiter: default_delimiter(),
        }
    }
}

impl OutputSettings {
    pub fn writer_config(&self) -> LineageResult<WriterConfig> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(delimiter), None) if delimiter != '"' && delimiter != '\n' && delimiter != '\r' => {
                Ok(WriterConfig { delimiter })
            }
            _ => Err(LineageError::ConfigError(format!(
                "Delimiter must be a single character other than a quote or line break, got {:?}",
                self.delimiter
            ))),
        }
    }
}
