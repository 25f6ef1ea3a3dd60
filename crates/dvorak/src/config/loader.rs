//! Configuration file loading for dvorak
//!
//! Handles loading and parsing configuration files using the config crate.
//! Sources are layered: embedded defaults, then an optional file, then
//! `DVORAK_*` environment variables.

use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};

use crate::config::{Config, ConfigError, ENV_PREFIX, EXAMPLE_CONFIG};
use crate::sandbox::validate_file_name;

impl Config {
    /// Load configuration from a file layered over the embedded defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(EXAMPLE_CONFIG, FileFormat::Toml))
            .add_source(File::from(path))
            .add_source(env_source())
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load the embedded defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(EXAMPLE_CONFIG, FileFormat::Toml))
            .add_source(env_source())
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.image.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty image"
                )));
            }
            if validate_file_name(&lang.source_name).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has invalid source name '{}'",
                    lang.source_name
                )));
            }
            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref compile) = lang.compile {
                if compile.command.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has empty compile command"
                    )));
                }
                if validate_file_name(&compile.output_name).is_err() {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' has invalid output name '{}'",
                        compile.output_name
                    )));
                }
            }
        }

        if self.sandbox.keepalive.is_empty() {
            return Err(ConfigError::Invalid(
                "sandbox keepalive command is empty".to_string(),
            ));
        }
        if !self.sandbox.work_dir.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "sandbox work_dir '{}' must be absolute",
                self.sandbox.work_dir
            )));
        }
        if self.queue.result_ttl == 0 {
            return Err(ConfigError::Invalid(
                "queue result_ttl must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
