use common::sandbox_options::SandboxOptions;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a run may go without posting a verdict before it is treated as a failed, test-absent run.
pub const DEFAULT_VERDICT_TIMEOUT: Duration = Duration::from_millis(5000);
/// How long a success stays on screen before the next level is selected.
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Builder, PartialEq, Eq)]
pub struct ControllerConfig {
    #[builder(default = "DEFAULT_VERDICT_TIMEOUT")]
    pub verdict_timeout: Duration,
    #[builder(default = "DEFAULT_ADVANCE_DELAY")]
    pub advance_delay: Duration,
    #[builder(default)]
    pub sandbox: SandboxOptions,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            verdict_timeout: DEFAULT_VERDICT_TIMEOUT,
            advance_delay: DEFAULT_ADVANCE_DELAY,
            sandbox: SandboxOptions::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The optional YAML configuration file. Command-line flags take precedence over its values.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub levels: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub verdict_timeout_ms: Option<u64>,
    pub advance_delay_ms: Option<u64>,
    pub max_console_lines: Option<usize>,
}

impl ConfigFile {
    /// Builds the [`ControllerConfig`] described by this file, using defaults for anything unset.
    pub fn controller_config(&self) -> ControllerConfig {
        let mut sandbox = SandboxOptions::default();
        if let Some(lines) = self.max_console_lines {
            sandbox.max_console_lines = lines.min(sandbox.max_console_lines);
        }
        ControllerConfig {
            verdict_timeout: self
                .verdict_timeout_ms
                .map_or(DEFAULT_VERDICT_TIMEOUT, Duration::from_millis),
            advance_delay: self
                .advance_delay_ms
                .map_or(DEFAULT_ADVANCE_DELAY, Duration::from_millis),
            sandbox,
        }
    }
}

pub fn parse_config_file(contents: &str) -> Result<ConfigFile, ConfigError> {
    Ok(serde_yaml::from_str(contents)?)
}

pub fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_file(&contents)
}
