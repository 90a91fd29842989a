//! YAML configuration: flag overrides, init commands, monitored commands.

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use logunify_core::CommandDescriptor;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of environment variables overriding flags
pub const ENV_PREFIX: &str = "LOGUNIFY_";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file does not exist
    #[error("Config file {} not found", .0.display())]
    Missing(PathBuf),

    /// The config file could not be read or parsed
    #[error("Error parsing config {}: {source}", path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Underlying figment error
        #[source]
        source: Box<figment::Error>,
    },
}

/// Scalar flag value; YAML and environment values arrive typed
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// `true` / `false`
    Bool(bool),
    /// Whole number
    Int(i64),
    /// Fractional number
    Float(f64),
    /// Anything else
    Text(String),
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Parameters of one monitored command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommandParams {
    /// Restart after exit
    #[serde(rename = "loop")]
    pub repeat: bool,
    /// Delay between runs in milliseconds
    #[serde(rename = "intervalMs")]
    pub interval_ms: u64,
}

/// Parsed config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Flag overrides, applied on top of the command line
    pub flags: BTreeMap<String, FlagValue>,
    /// One-shot commands run before supervision starts
    pub init: Vec<String>,
    /// Monitored commands keyed by their command line
    pub commands: BTreeMap<String, CommandParams>,
}

impl Config {
    /// Figment merging `path` with `LOGUNIFY_*` flag overrides
    pub fn figment(path: &Path) -> Figment {
        Figment::new().merge(Yaml::file(path)).merge(
            Env::prefixed(ENV_PREFIX).map(|key| format!("flags.{key}").into()),
        )
    }

    /// Load the config at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or does not parse
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        Self::figment(path).extract().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Command descriptors ordered by command line, which fixes the columns
    #[must_use]
    pub fn descriptors(&self) -> Vec<CommandDescriptor> {
        self.commands
            .iter()
            .map(|(name, params)| CommandDescriptor {
                name: name.clone(),
                repeat: params.repeat,
                interval_ms: params.interval_ms,
            })
            .collect()
    }
}
