//! Configuration for the filedata tools

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix (`FILEDATA_READ_BUFFER_SIZE=65536`, ...)
pub const ENV_PREFIX: &str = "FILEDATA";

/// Global configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Logging level, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Size of the buffer handed to each decoder read
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    /// Directory that `extract` writes documents into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Abort on the first corrupt document instead of skipping it
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_read_buffer_size() -> usize {
    64 * 1024
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./documents")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            read_buffer_size: default_read_buffer_size(),
            output_dir: default_output_dir(),
            fail_fast: false,
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then apply `FILEDATA_*` environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        builder = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "read_buffer_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
