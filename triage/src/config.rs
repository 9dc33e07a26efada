//! Configuration management for Triage
//!
//! A [`Config`] is built once at startup and handed to the stores and the
//! service explicitly; nothing in the library reads configuration from a
//! global. Values are layered in this order (later wins):
//!
//! 1. Defaults
//! 2. Environment variables prefixed with `TRIAGE_`
//! 3. A `triage.yaml` file

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const ENV_PREFIX: &str = "TRIAGE";
const CONFIG_FILE_NAME: &str = "triage.yaml";
const ISSUES_FILE_NAME: &str = "issues.json";

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the configuration file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}\n\nHint: Check for proper indentation and YAML formatting")]
    YamlParse {
        /// Path to the configuration file with invalid YAML content
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Name of the configuration field
        field: String,
        /// The rejected value
        value: String,
        /// How to fix it
        hint: String,
    },
}

/// Runtime settings for the issue service and its stores
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the file-backed store (default: `.triage`)
    pub data_dir: PathBuf,
    /// Page size used when a list request does not name one (default: 20)
    pub default_page_size: usize,
    /// Smallest accepted page size (default: 10)
    pub min_page_size: usize,
    /// Largest accepted page size (default: 100)
    pub max_page_size: usize,
    /// Maximum title length in characters (default: 200)
    pub max_title_length: usize,
    /// Maximum description length in characters (default: 2000)
    pub max_description_length: usize,
    /// Maximum assignee/reporter length in characters (default: 100)
    pub max_person_length: usize,
    /// Prefix of generated issue ids (default: `iss-`)
    pub id_prefix: String,
    /// How many id candidates to try before giving up (default: 16)
    pub max_id_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".triage"),
            default_page_size: 20,
            min_page_size: 10,
            max_page_size: 100,
            max_title_length: 200,
            max_description_length: 2000,
            max_person_length: 100,
            id_prefix: "iss-".to_string(),
            max_id_attempts: 16,
        }
    }
}

impl Config {
    /// Build a configuration from defaults, environment variables and the
    /// first `triage.yaml` found.
    ///
    /// Never fails: a broken YAML file or out-of-range value is logged and
    /// the previous layer is kept.
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_env_vars();

        if let Some(path) = Self::find_yaml_config_file() {
            match YamlConfig::load_from_file(&path) {
                Ok(yaml) => {
                    let mut candidate = config.clone();
                    yaml.apply_to_config(&mut candidate);
                    match candidate.validate() {
                        Ok(()) => {
                            config = candidate;
                            tracing::debug!("Loaded configuration from {}", path.display());
                        }
                        Err(e) => tracing::warn!(
                            "Ignoring {}: {}. Continuing with environment variables and defaults.",
                            path.display(),
                            e
                        ),
                    }
                }
                Err(e) => tracing::warn!(
                    "Failed to load YAML configuration, falling back to env vars and defaults: {}",
                    e
                ),
            }
        }

        if let Err(e) = config.validate() {
            tracing::warn!("Invalid configuration from environment ({}), using defaults", e);
            config = Self::default();
        }

        config
    }

    /// Path of the JSON document used by the file-backed store
    pub fn issues_file(&self) -> PathBuf {
        self.data_dir.join(ISSUES_FILE_NAME)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(dir) = std::env::var(env_key("DATA_DIR")) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        env_override("DEFAULT_PAGE_SIZE", &mut self.default_page_size);
        env_override("MIN_PAGE_SIZE", &mut self.min_page_size);
        env_override("MAX_PAGE_SIZE", &mut self.max_page_size);
        env_override("MAX_TITLE_LENGTH", &mut self.max_title_length);
        env_override("MAX_DESCRIPTION_LENGTH", &mut self.max_description_length);
        env_override("MAX_PERSON_LENGTH", &mut self.max_person_length);
        env_override("ID_PREFIX", &mut self.id_prefix);
        env_override("MAX_ID_ATTEMPTS", &mut self.max_id_attempts);
    }

    /// Look for `triage.yaml` in the working directory, then in
    /// `~/.config/triage/`.
    pub fn find_yaml_config_file() -> Option<PathBuf> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".config").join("triage").join(CONFIG_FILE_NAME));
        }
        candidates.into_iter().find(|p| p.is_file())
    }

    /// Check that the values are mutually consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_page_size == 0 {
            return Err(invalid(
                "min_page_size",
                self.min_page_size,
                "Page sizes must be at least 1",
            ));
        }
        if self.min_page_size > self.max_page_size {
            return Err(invalid(
                "max_page_size",
                self.max_page_size,
                "max_page_size must not be smaller than min_page_size",
            ));
        }
        if !(self.min_page_size..=self.max_page_size).contains(&self.default_page_size) {
            return Err(invalid(
                "default_page_size",
                self.default_page_size,
                "default_page_size must lie between min_page_size and max_page_size",
            ));
        }
        for (field, value) in [
            ("max_title_length", self.max_title_length),
            ("max_description_length", self.max_description_length),
            ("max_person_length", self.max_person_length),
        ] {
            if value == 0 {
                return Err(invalid(field, value, "Length limits must be positive"));
            }
        }
        if self.id_prefix.is_empty() || self.id_prefix.chars().any(char::is_whitespace) {
            return Err(invalid(
                "id_prefix",
                &self.id_prefix,
                "The id prefix must be non-empty and contain no whitespace",
            ));
        }
        if self.max_id_attempts == 0 {
            return Err(invalid(
                "max_id_attempts",
                self.max_id_attempts,
                "At least one id attempt is required",
            ));
        }
        Ok(())
    }

    /// Example configuration file contents
    pub fn example_yaml_config() -> &'static str {
        r#"# Triage configuration
data_dir: .triage
default_page_size: 20
min_page_size: 10
max_page_size: 100
max_title_length: 200
max_description_length: 2000
max_person_length: 100
id_prefix: "iss-"
max_id_attempts: 16
"#
    }
}

fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}_{suffix}")
}

fn env_override<T: FromStr>(suffix: &str, target: &mut T) {
    let key = env_key(suffix);
    if let Ok(raw) = std::env::var(&key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw),
        }
    }
}

fn invalid(field: &str, value: impl ToString, hint: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        hint: hint.to_string(),
    }
}

/// The subset of [`Config`] that may appear in `triage.yaml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    /// See [`Config::data_dir`]
    pub data_dir: Option<PathBuf>,
    /// See [`Config::default_page_size`]
    pub default_page_size: Option<usize>,
    /// See [`Config::min_page_size`]
    pub min_page_size: Option<usize>,
    /// See [`Config::max_page_size`]
    pub max_page_size: Option<usize>,
    /// See [`Config::max_title_length`]
    pub max_title_length: Option<usize>,
    /// See [`Config::max_description_length`]
    pub max_description_length: Option<usize>,
    /// See [`Config::max_person_length`]
    pub max_person_length: Option<usize>,
    /// See [`Config::id_prefix`]
    pub id_prefix: Option<String>,
    /// See [`Config::max_id_attempts`]
    pub max_id_attempts: Option<u32>,
}

impl YamlConfig {
    /// Overwrite the fields of `config` that are set in this file
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(v) = self.default_page_size {
            config.default_page_size = v;
        }
        if let Some(v) = self.min_page_size {
            config.min_page_size = v;
        }
        if let Some(v) = self.max_page_size {
            config.max_page_size = v;
        }
        if let Some(v) = self.max_title_length {
            config.max_title_length = v;
        }
        if let Some(v) = self.max_description_length {
            config.max_description_length = v;
        }
        if let Some(v) = self.max_person_length {
            config.max_person_length = v;
        }
        if let Some(prefix) = &self.id_prefix {
            config.id_prefix = prefix.clone();
        }
        if let Some(v) = self.max_id_attempts {
            config.max_id_attempts = v;
        }
    }

    /// Read and parse a YAML configuration file. An empty file is valid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
