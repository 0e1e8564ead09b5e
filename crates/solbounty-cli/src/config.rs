/*
[INPUT]:  Optional YAML configuration file and SOLBOUNTY__* environment variables
[OUTPUT]: Parsed CLI configuration with library configs derived from it
[POS]:    Configuration layer - endpoints, origin, storage paths and timeouts
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use solbounty_auth::{ClientConfig, NegotiatorConfig};

const APP_DIR: &str = "solbounty";

/// Top-level configuration for the SolBounty CLI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Identity API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Origin embedded in challenges; must match what the server expects
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Label of the local wallet used by default
    #[serde(default = "default_wallet_label")]
    pub wallet: String,
    /// Directory holding local wallet keys
    #[serde(default)]
    pub key_dir: Option<PathBuf>,
    /// File the session cookie is persisted to
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Per suspension point timeouts, in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_prompt_secs")]
    pub connect_secs: u64,
    #[serde(default = "default_prompt_secs")]
    pub sign_secs: u64,
    #[serde(default = "default_verify_secs")]
    pub verify_secs: u64,
    #[serde(default = "default_http_secs")]
    pub http_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_prompt_secs(),
            sign_secs: default_prompt_secs(),
            verify_secs: default_verify_secs(),
            http_secs: default_http_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            origin: default_origin(),
            wallet: default_wallet_label(),
            key_dir: None,
            session_file: None,
            timeouts: TimeoutConfig::default(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_wallet_label() -> String {
    "default".to_string()
}

fn default_prompt_secs() -> u64 {
    120
}

fn default_verify_secs() -> u64 {
    30
}

fn default_http_secs() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration, layering environment variables over the YAML file
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Yaml).required(true),
            None => File::from(default_config_path()?)
                .format(FileFormat::Yaml)
                .required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("SOLBOUNTY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("read configuration sources")?;

        settings
            .try_deserialize()
            .context("deserialize configuration")
    }

    pub fn key_dir(&self) -> Result<PathBuf> {
        match &self.key_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("keys")),
        }
    }

    pub fn session_file(&self) -> Result<PathBuf> {
        match &self.session_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("session.json")),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.timeouts.http_secs),
            ..ClientConfig::default()
        }
    }

    pub fn negotiator_config(&self) -> NegotiatorConfig {
        NegotiatorConfig {
            origin: self.origin.clone(),
            connect_timeout: Duration::from_secs(self.timeouts.connect_secs),
            sign_timeout: Duration::from_secs(self.timeouts.sign_secs),
            verify_timeout: Duration::from_secs(self.timeouts.verify_secs),
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join(APP_DIR))
}

/// `<config dir>/solbounty/config.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join(APP_DIR)
        .join("config.yaml"))
}
