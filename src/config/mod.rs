// ABOUTME: Configuration types and parsing for diskpush.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and config discovery.

mod api;
mod deserialize;
mod env_value;
mod init;
mod upload;

pub use api::ApiConfig;
pub use env_value::EnvValue;
pub use init::init_config;
pub use upload::UploadConfig;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "diskpush.yml";
pub const CONFIG_FILENAME_ALT: &str = "diskpush.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".diskpush/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,

    #[serde(default)]
    pub upload: UploadConfig,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
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
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }
}
