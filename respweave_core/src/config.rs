use crate::codec::OutputFormat;
use crate::dictionary::{Dictionary, DictionaryError};
use crate::mutator::Limits;
use crate::reducer::Equivalence;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "RESPWEAVE_CONFIG";
pub const FORMAT_VAR: &str = "RESPWEAVE_FORMAT";
pub const COUNT_VAR: &str = "RESPWEAVE_COUNT";
pub const MAX_COMMANDS_VAR: &str = "RESPWEAVE_MAX_CMDS";
pub const MAX_ARGUMENTS_VAR: &str = "RESPWEAVE_MAX_ARGS";
pub const MAX_ARGUMENT_LENGTH_VAR: &str = "RESPWEAVE_MAX_ARG_LEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to load dictionary: {0}")]
    Dictionary(#[from] DictionaryError),
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("{key} is out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct MutatorSettings {
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_iteration_count")]
    pub iteration_count: u32,
    #[serde(default = "default_max_program_length")]
    pub max_program_length: usize,
    #[serde(default = "default_max_arguments")]
    pub max_arguments: usize,
    #[serde(default = "default_max_argument_length")]
    pub max_argument_length: usize,
    /// JSON token pools replacing the built-in dictionary.
    pub dictionary_path: Option<PathBuf>,
}

pub fn default_iteration_count() -> u32 {
    64
}
pub fn default_max_program_length() -> usize {
    2000
}
pub fn default_max_arguments() -> usize {
    4096
}
pub fn default_max_argument_length() -> usize {
    65536
}

impl Default for MutatorSettings {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            iteration_count: default_iteration_count(),
            max_program_length: default_max_program_length(),
            max_arguments: default_max_arguments(),
            max_argument_length: default_max_argument_length(),
            dictionary_path: None,
        }
    }
}

impl MutatorSettings {
    pub fn limits(&self) -> Limits {
        Limits {
            max_program_length: self.max_program_length,
            max_arguments: self.max_arguments,
            max_argument_length: self.max_argument_length,
        }
    }

    /// The configured dictionary, or the built-in one.
    pub fn load_dictionary(&self) -> Result<Dictionary, ConfigError> {
        match &self.dictionary_path {
            Some(path) => Ok(Dictionary::load_from_file(path)?),
            None => Ok(Dictionary::default()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ReducerSettings {
    #[serde(default)]
    pub equivalence: Equivalence,
    #[serde(default = "default_min_block")]
    pub min_block: usize,
    #[serde(default = "default_max_block")]
    pub max_block: usize,
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,
    #[serde(default = "default_reducer_max_arguments")]
    pub max_arguments: usize,
    #[serde(default = "default_reducer_max_argument_length")]
    pub max_argument_length: usize,
    /// Operation whose arguments after the key form an unbounded tuple list.
    #[serde(default = "default_tuple_operation")]
    pub tuple_operation: String,
    #[serde(default = "default_tuple_width")]
    pub tuple_width: usize,
    #[serde(default = "default_max_tuples")]
    pub max_tuples: usize,
}

fn default_min_block() -> usize {
    3
}
fn default_max_block() -> usize {
    12
}
fn default_keep_count() -> usize {
    2
}
fn default_reducer_max_arguments() -> usize {
    64
}
fn default_reducer_max_argument_length() -> usize {
    64
}
fn default_tuple_operation() -> String {
    "GEOADD".to_string()
}
fn default_tuple_width() -> usize {
    3
}
fn default_max_tuples() -> usize {
    5
}

impl Default for ReducerSettings {
    fn default() -> Self {
        Self {
            equivalence: Equivalence::default(),
            min_block: default_min_block(),
            max_block: default_max_block(),
            keep_count: default_keep_count(),
            max_arguments: default_reducer_max_arguments(),
            max_argument_length: default_reducer_max_argument_length(),
            tuple_operation: default_tuple_operation(),
            tuple_width: default_tuple_width(),
            max_tuples: default_max_tuples(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct RespweaveConfig {
    #[serde(default)]
    pub mutator: MutatorSettings,
    #[serde(default)]
    pub reducer: ReducerSettings,
}

impl RespweaveConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RespweaveConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the file named by `RESPWEAVE_CONFIG` (if any), then applies the
    /// remaining environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RespweaveConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) if !path.is_empty() => Self::load_from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_env_overrides(lookup)?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(format) = lookup(FORMAT_VAR) {
            self.mutator.output_format = parse_var(FORMAT_VAR, &format)?;
        }
        if let Some(count) = lookup(COUNT_VAR) {
            self.mutator.iteration_count = parse_var(COUNT_VAR, &count)?;
        }
        if let Some(max) = lookup(MAX_COMMANDS_VAR) {
            self.mutator.max_program_length = parse_var(MAX_COMMANDS_VAR, &max)?;
        }
        if let Some(max) = lookup(MAX_ARGUMENTS_VAR) {
            self.mutator.max_arguments = parse_var(MAX_ARGUMENTS_VAR, &max)?;
        }
        if let Some(max) = lookup(MAX_ARGUMENT_LENGTH_VAR) {
            self.mutator.max_argument_length = parse_var(MAX_ARGUMENT_LENGTH_VAR, &max)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mutator = &self.mutator;
        let reducer = &self.reducer;
        positive("mutator.iteration-count", mutator.iteration_count as usize)?;
        positive("mutator.max-program-length", mutator.max_program_length)?;
        positive("mutator.max-arguments", mutator.max_arguments)?;
        positive("mutator.max-argument-length", mutator.max_argument_length)?;
        positive("reducer.min-block", reducer.min_block)?;
        positive("reducer.keep-count", reducer.keep_count)?;
        positive("reducer.max-arguments", reducer.max_arguments)?;
        positive("reducer.max-argument-length", reducer.max_argument_length)?;
        positive("reducer.tuple-width", reducer.tuple_width)?;
        if reducer.min_block > reducer.max_block {
            return Err(ConfigError::OutOfRange {
                key: "reducer.max-block",
                reason: format!(
                    "must be at least min-block ({}), got {}",
                    reducer.min_block, reducer.max_block
                ),
            });
        }
        Ok(())
    }
}

fn positive(key: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::OutOfRange {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
