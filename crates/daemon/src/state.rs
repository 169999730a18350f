//! On-disk state directory
//!
//! ```text
//! ~/.strongroom/
//!   config.toml   daemon configuration
//!   db.sqlite     namespace store
//!   token.key     hex key signing bearer tokens
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub const APP_NAME: &str = "strongroom";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const TOKEN_KEY_FILE_NAME: &str = "token.key";

pub const DEFAULT_API_PORT: u16 = 8200;
const TOKEN_KEY_SIZE: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the HTTP API
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Default log filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for rolling log files, stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Lifetime of issued bearer tokens
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_ttl_secs() -> u64 {
    3600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            log_level: default_log_level(),
            log_dir: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> Result<tracing::Level, StateError> {
        self.log_level
            .parse()
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Root of the state directory
    pub state_dir: PathBuf,
    pub db_path: PathBuf,
    pub token_key_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Default state directory, `~/.strongroom`
    pub fn default_dir() -> Result<PathBuf, StateError> {
        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    fn resolve_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        match custom_path {
            Some(path) => Ok(path),
            None => Self::default_dir(),
        }
    }

    fn at(state_dir: PathBuf, config: AppConfig) -> Self {
        Self {
            db_path: state_dir.join(DB_FILE_NAME),
            token_key_path: state_dir.join(TOKEN_KEY_FILE_NAME),
            state_dir,
            config,
        }
    }

    /// Create the state directory, its config and a fresh token key.
    ///
    /// Fails if the directory already holds a config.
    pub fn init(custom_path: Option<PathBuf>, config: AppConfig) -> Result<Self, StateError> {
        let state_dir = Self::resolve_dir(custom_path)?;
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized(state_dir));
        }
        std::fs::create_dir_all(&state_dir)?;

        let state = Self::at(state_dir, config);

        let mut key = Zeroizing::new([0u8; TOKEN_KEY_SIZE]);
        common::crypto::random_bytes(&mut key[..])
            .map_err(|e| StateError::Randomness(e.to_string()))?;
        std::fs::write(&state.token_key_path, hex::encode(&key[..]))?;

        let toml = toml::to_string_pretty(&state.config)?;
        std::fs::write(config_path, toml)?;

        Ok(state)
    }

    /// Load an initialized state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let state_dir = Self::resolve_dir(custom_path)?;
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::NotInitialized(state_dir));
        }

        let config: AppConfig = toml::from_str(&std::fs::read_to_string(config_path)?)?;
        Ok(Self::at(state_dir, config))
    }

    /// Key used to sign bearer tokens
    pub fn load_token_key(&self) -> Result<Zeroizing<Vec<u8>>, StateError> {
        let contents = Zeroizing::new(std::fs::read_to_string(&self.token_key_path)?);
        let key = hex::decode(contents.trim()).map_err(|_| StateError::InvalidTokenKey)?;
        if key.is_empty() {
            return Err(StateError::InvalidTokenKey);
        }
        Ok(Zeroizing::new(key))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not determine home directory")]
    NoHomeDirectory,
    #[error("state directory {0:?} is not initialized, run `strongroom init`")]
    NotInitialized(PathBuf),
    #[error("state directory {0:?} is already initialized")]
    AlreadyInitialized(PathBuf),
    #[error("token key is not valid hex")]
    InvalidTokenKey,
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("failed to generate token key: {0}")]
    Randomness(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
    #[error("failed to write config: {0}")]
    WriteConfig(#[from] toml::ser::Error),
}
