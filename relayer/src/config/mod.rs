//! Configuration Management Module
//!
//! Loads the relayer configuration from TOML. Secrets (the relayer key, the TronGrid API key)
//! are never stored in the file; the file names the environment variables holding them.

use crate::controller::SendSettings;
use chain_clients_tron::TronAddress;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the config path.
pub const CONFIG_PATH_ENV: &str = "TRON_RELAYER_CONFIG_PATH";

const DEFAULT_CONFIG_PATH: &str = "config/tron-relayer.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tron node and controller settings
    pub tron: TronConfig,
    /// Relayer identity
    #[serde(default)]
    pub relayer: RelayerConfig,
}

/// Tron node, controller and submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TronConfig {
    /// Full-node HTTP endpoint (e.g. https://api.trongrid.io)
    pub rpc_url: String,
    /// Controller contract address (base58 or hex)
    pub controller_address: String,
    /// Fee ceiling in sun stamped into every transaction
    #[serde(default = "default_fee_limit_sun")]
    pub fee_limit_sun: u64,
    /// TRX value attached to controller multicalls; must stay 0
    #[serde(default)]
    pub multicall_call_value_sun: u64,
    /// Execution-info lookups per transaction before giving up
    #[serde(default = "default_poll_times")]
    pub poll_times: u32,
    /// Milliseconds between execution-info lookups
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request HTTP timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Environment variable holding a TronGrid API key (optional)
    #[serde(default)]
    pub api_key_env: Option<String>,
}

/// Relayer identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// Environment variable name containing the hex secp256k1 private key
    /// Default: "TRON_RELAYER_PRIVATE_KEY"
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

fn default_fee_limit_sun() -> u64 {
    150_000_000
}

fn default_poll_times() -> u32 {
    20
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_private_key_env() -> String {
    "TRON_RELAYER_PRIVATE_KEY".to_string()
}

impl TronConfig {
    /// Parsed controller address.
    pub fn controller(&self) -> anyhow::Result<TronAddress> {
        self.controller_address.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid controller_address '{}': {}",
                self.controller_address,
                e
            )
        })
    }

    /// Loads the API key from the configured environment variable, if one is configured.
    pub fn get_api_key(&self) -> anyhow::Result<Option<String>> {
        match &self.api_key_env {
            None => Ok(None),
            Some(var) => std::env::var(var).map(Some).map_err(|_| {
                anyhow::anyhow!("Environment variable '{}' not set (api_key_env).", var)
            }),
        }
    }
}

impl RelayerConfig {
    /// Loads the private key from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The private key (hex, optional 0x prefix)
    /// * `Err(anyhow::Error)` - Variable not set
    pub fn get_private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.private_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with the relayer's Tron private key (hex).",
                self.private_key_env
            )
        })
    }
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// Checks:
    /// - The controller address decodes
    /// - Polling and timeout values are nonzero
    /// - Sun amounts fit the protocol's int64 fields
    ///
    /// The multicall call value is checked when a multicall is sent, not here.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tron.rpc_url.trim().is_empty() {
            anyhow::bail!("Configuration error: tron.rpc_url is empty");
        }
        self.tron.controller()?;
        if self.tron.poll_times == 0 {
            anyhow::bail!("Configuration error: tron.poll_times must be at least 1");
        }
        if self.tron.poll_interval_ms == 0 {
            anyhow::bail!("Configuration error: tron.poll_interval_ms must be nonzero");
        }
        if self.tron.request_timeout_ms == 0 {
            anyhow::bail!("Configuration error: tron.request_timeout_ms must be nonzero");
        }
        self.send_settings()?;
        Ok(())
    }

    /// Submission settings derived from `[tron]`.
    pub fn send_settings(&self) -> anyhow::Result<SendSettings> {
        let fee_limit = i64::try_from(self.tron.fee_limit_sun).map_err(|_| {
            anyhow::anyhow!("Configuration error: tron.fee_limit_sun does not fit int64")
        })?;
        let call_value = i64::try_from(self.tron.multicall_call_value_sun).map_err(|_| {
            anyhow::anyhow!("Configuration error: tron.multicall_call_value_sun does not fit int64")
        })?;
        Ok(SendSettings {
            fee_limit,
            call_value,
            poll_times: self.tron.poll_times,
            poll_interval: Duration::from_millis(self.tron.poll_interval_ms),
        })
    }

    /// Loads configuration from a TOML file.
    ///
    /// Path priority: `path` argument, then `TRON_RELAYER_CONFIG_PATH`, then
    /// `config/tron-relayer.toml`.
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - File missing, unparsable, or invalid
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/tron-relayer.template.toml config/tron-relayer.toml\n\
                Then edit config/tron-relayer.toml with your actual values.",
                config_path
            ))
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }
}
