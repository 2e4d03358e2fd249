// ABOUTME: Configuration types and parsing for podvisor.yml.
// ABOUTME: Handles discovery, YAML parsing, defaults, and conversion to service options.

mod deserialize;
mod init;
mod operations;
mod stop;

pub use init::init_config;
pub use operations::OperationsConfig;
pub use stop::StopConfig;

use crate::error::{Error, Result};
use crate::pod::{Defaults, Limits, ServiceOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "podvisor.yml";
pub const CONFIG_FILENAME_ALT: &str = "podvisor.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".podvisor/config.yml";

const DEFAULT_STATE_FILE: &str = ".local/state/podvisor/pods.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where the pod registry is persisted.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub stop: StopConfig,

    #[serde(default)]
    pub operations: OperationsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Docker or Podman API socket. Local defaults when unset.
    #[serde(default)]
    pub socket: Option<String>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config.
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "using config file");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like [`Config::discover`], falling back to defaults when no file exists.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Configured state file, or the per-user default.
    pub fn state_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.state_file {
            return Ok(path.clone());
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(DEFAULT_STATE_FILE))
            .ok_or_else(|| {
                Error::InvalidConfig("HOME is not set; configure state_file explicitly".into())
            })
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            defaults: Defaults {
                stop_timeout: self.stop.timeout,
                kill_signal: self.stop.kill_signal,
            },
            limits: Limits {
                max_parallel_members: self.operations.max_parallel_members,
                member_timeout: self.operations.member_timeout,
            },
            max_parallel_pods: self.operations.max_parallel_pods,
        }
    }
}
