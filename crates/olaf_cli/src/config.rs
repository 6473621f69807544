//! Layered settings: CLI flag > environment > JSON config file > default.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use olaf::{AugmentationConfig, EngineConfig, MarkerPolicy, DEFAULT_CHUNK_CHARS};
use serde::Deserialize;
use thiserror::Error;

use crate::cli::CliArgs;

pub const CONFIG_ENV_VAR: &str = "OLAF_CONFIG";
pub const DATA_DIR_ENV_VAR: &str = "OLAF_DATA_DIR";
pub const OLLAMA_URL_ENV_VAR: &str = "OLAF_OLLAMA_URL";
pub const SEARCH_URL_ENV_VAR: &str = "OLAF_SEARCH_URL";
pub const SEARCH_ENV_VAR: &str = "OLAF_SEARCH";
pub const PROVIDER_ENV_VAR: &str = "OLAF_PROVIDER";
pub const LOG_ENV_VAR: &str = "OLAF_LOG";

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_SEARCH_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SEC: u64 = 120;
pub const DEFAULT_REVEAL_TICK_MS: u64 = 8;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {setting}: {message}")]
    Invalid {
        setting: &'static str,
        message: String,
    },

    #[error("could not determine a data directory; pass --data-dir or set {DATA_DIR_ENV_VAR}")]
    NoDataDir,
}

impl ConfigError {
    fn invalid(setting: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            setting,
            message: message.into(),
        }
    }
}

/// On-disk configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub ollama_url: Option<String>,
    pub search_url: Option<String>,
    pub search_enabled: Option<bool>,
    pub forward_search_markers: Option<bool>,
    pub timeout_sec: Option<u64>,
    pub reveal_chunk_chars: Option<usize>,
    pub reveal_tick_ms: Option<u64>,
    pub provider: Option<String>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn parse(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.timeout_sec == Some(0) {
            return Err(ConfigError::invalid("timeout_sec", "must be greater than zero"));
        }
        if config.reveal_chunk_chars == Some(0) {
            return Err(ConfigError::invalid(
                "reveal_chunk_chars",
                "must be greater than zero",
            ));
        }
        Ok(config)
    }

    /// Reads `path`. A missing file is only an error when `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::parse(path, &raw),
            Err(error) if error.kind() == io::ErrorKind::NotFound && !required => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::invalid(
                "provider",
                format!("unsupported provider '{other}', expected ollama or mock"),
            )),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub ollama_url: String,
    pub search_url: String,
    pub search_enabled: bool,
    pub marker_policy: MarkerPolicy,
    pub timeout: Duration,
    pub reveal_chunk_chars: usize,
    pub reveal_tick: Duration,
    pub provider: ProviderKind,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Resolves settings from the process environment.
    pub fn from_env(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::resolve(args, &env_string_opt, dirs::data_dir())
    }

    /// Resolves settings with an explicit environment lookup and platform data dir.
    pub fn resolve(
        args: &CliArgs,
        env: &dyn Fn(&str) -> Option<String>,
        platform_data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let pre_file_data_dir = args
            .data_dir
            .clone()
            .or_else(|| env(DATA_DIR_ENV_VAR).map(PathBuf::from));

        let explicit_config = args
            .config
            .clone()
            .or_else(|| env(CONFIG_ENV_VAR).map(PathBuf::from));
        let default_data_dir = platform_data_dir.map(|dir| dir.join("olaf"));

        let (config_path, file) = match explicit_config {
            Some(path) => {
                let file = FileConfig::load(&path, true)?;
                (path, file)
            }
            None => {
                let base = pre_file_data_dir
                    .clone()
                    .or_else(|| default_data_dir.clone())
                    .ok_or(ConfigError::NoDataDir)?;
                let path = base.join(CONFIG_FILE_NAME);
                let file = FileConfig::load(&path, false)?;
                (path, file)
            }
        };

        let data_dir = pre_file_data_dir
            .or_else(|| file.data_dir.clone())
            .or(default_data_dir)
            .ok_or(ConfigError::NoDataDir)?;

        let search_enabled = match args.search_override() {
            Some(enabled) => enabled,
            None => match env(SEARCH_ENV_VAR) {
                Some(raw) => parse_flag(SEARCH_ENV_VAR, &raw)?,
                None => file.search_enabled.unwrap_or(false),
            },
        };

        let provider = args
            .provider
            .clone()
            .or_else(|| env(PROVIDER_ENV_VAR))
            .or_else(|| file.provider.clone())
            .map(|value| value.parse::<ProviderKind>())
            .transpose()?
            .unwrap_or(ProviderKind::Ollama);

        let marker_policy = if file.forward_search_markers.unwrap_or(false) {
            MarkerPolicy::Forward
        } else {
            MarkerPolicy::Exclude
        };

        Ok(Self {
            config_path,
            data_dir,
            ollama_url: first_of(&args.ollama_url, env(OLLAMA_URL_ENV_VAR), &file.ollama_url)
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            search_url: first_of(&args.search_url, env(SEARCH_URL_ENV_VAR), &file.search_url)
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            search_enabled,
            marker_policy,
            timeout: Duration::from_secs(file.timeout_sec.unwrap_or(DEFAULT_TIMEOUT_SEC)),
            reveal_chunk_chars: file.reveal_chunk_chars.unwrap_or(DEFAULT_CHUNK_CHARS),
            reveal_tick: Duration::from_millis(file.reveal_tick_ms.unwrap_or(DEFAULT_REVEAL_TICK_MS)),
            provider,
            log_level: first_of(&args.log_level, env(LOG_ENV_VAR), &file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_file: args.log_file.clone(),
        })
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            augmentation: AugmentationConfig {
                enabled: self.search_enabled,
                marker_policy: self.marker_policy,
            },
            reveal_chunk_chars: self.reveal_chunk_chars,
        }
    }

    /// Directory of the key-value store inside the data directory.
    #[must_use]
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

fn first_of(flag: &Option<String>, env: Option<String>, file: &Option<String>) -> Option<String> {
    flag.clone()
        .or(env)
        .or_else(|| file.clone())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(setting: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(setting, format!("expected a boolean, got '{other}'"))),
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
