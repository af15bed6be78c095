// src/config/mod.rs
mod schema;

use std::io::Write;
use std::path::{Path, PathBuf};
use config::{Config as ConfigLoader, FileFormat};
use tracing::{info, warn};

pub use schema::{Config, ExecutionSettings, OutputSettings};

use crate::error::{LineageResult, LineageError};
use crate::persist::write_atomic;

const ENV_PREFIX: &str = "LINEAGE";

/// Centralized configuration handling
impl Config {
    /// Load configuration from a file, falling back to the built-in defaults.
    ///
    /// Layers, lowest priority first: built-in defaults, the user file (`config_path`,
    /// else the default location if present), then `LINEAGE_*` environment variables
    /// with `__` between nested keys, e.g. `LINEAGE_EXECUTION__PARALLEL=false`.
    pub fn load(config_path: Option<&Path>) -> LineageResult<Self> {
        Self::load_layered(config_path, ENV_PREFIX)
    }

    fn load_layered(config_path: Option<&Path>, env_prefix: &str) -> LineageResult<Self> {
        info!("Loading configuration");

        let mut config_builder = ConfigLoader::builder();

        // Default configuration
        config_builder = config_builder.add_source(
            config::File::from_str(
                include_str!("../../config/default.toml"),
                FileFormat::Toml
            )
        );

        // User-provided configuration
        if let Some(path) = config_path {
            if path.exists() {
                config_builder = config_builder.add_source(config::File::from(path));
                info!("Loading user configuration from: {}", path.display());
            } else {
                warn!("Specified configuration file not found: {}", path.display());
            }
        } else {
            let default_path = Self::default_config_path();
            if default_path.exists() {
                config_builder = config_builder.add_source(config::File::from(default_path.as_path()));
                info!("Loading default configuration from: {}", default_path.display());
            } else {
                info!("No existing configuration found, using built-in defaults");
            }
        }

        // Environment variables
        config_builder = config_builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
        );

        let config: Config = match config_builder.build() {
            Ok(c) => match c.try_deserialize() {
                Ok(config) => config,
                Err(e) => return Err(LineageError::ConfigError(format!("Failed to parse configuration: {}", e))),
            },
            Err(e) => return Err(LineageError::ConfigError(format!("Failed to build configuration: {}", e))),
        };

        // Reject a bad delimiter at load time rather than at the first write
        config.output.writer_config()?;

        Ok(config)
    }

    /// Get the default configuration path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lineage/config.toml")
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> LineageResult<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| LineageError::SerializationError(format!("Failed to serialize configuration: {}", e)))?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            crate::persist::ensure_directory(parent)?;
        }
        write_atomic(path, |out: &mut dyn Write| out.write_all(config_str.as_bytes()))?;

        info!("Configuration saved to {}", path.display());

        Ok(())
    }
}
