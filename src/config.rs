//! Configuration management for MeshLedger

use crate::blockchain::ReceivePolicy;
use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL peers use to reach this node. Defaults to `http://localhost:<port>`.
    #[serde(default)]
    pub node_url: Option<String>,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            node_url: None,
            bootstrap_peers: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl NetworkConfig {
    pub fn node_url(&self) -> String {
        self.node_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

/// Absent path means the ledger lives in memory only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsensusConfig {
    /// Re-check hash and difficulty of blocks pushed by peers before appending.
    #[serde(default)]
    pub verify_received_blocks: bool,
}

impl ConsensusConfig {
    pub fn receive_policy(&self) -> ReceivePolicy {
        if self.verify_received_blocks {
            ReceivePolicy::VerifyProof
        } else {
            ReceivePolicy::TrustLinkage
        }
    }
}

fn default_port() -> u16 {
    3001
}

fn default_request_timeout() -> u64 {
    10
}

/// Load a TOML config file, falling back to defaults when it is absent.
pub fn load_config_from(path: &Path) -> Result<Config, ChainError> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config = parse_config(&config_str)?;
    Ok(config)
}

pub fn parse_config(config_str: &str) -> Result<Config, ChainError> {
    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(config_str)
            .map_err(|e| ChainError::ConfigError(format!("Failed to parse config: {}", e)))?
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<(), ChainError> {
    let node_url = config.network.node_url();
    if !(node_url.starts_with("http://") || node_url.starts_with("https://")) {
        return Err(ChainError::ConfigError(format!(
            "network.node_url must be an http(s) URL, got {}",
            node_url
        )));
    }

    if config.network.request_timeout_secs == 0 {
        return Err(ChainError::ConfigError(
            "network.request_timeout_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(path) = &config.database.path {
        if path.is_empty() {
            return Err(ChainError::ConfigError(
                "database.path must not be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}
