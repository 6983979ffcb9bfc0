//! CLI configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tollbooth_store::{default_data_dir, NULLIFIER_DB_FILE};
use tollbooth_x402::{ClientConfig, X402Config};

use crate::error::{CliError, CliResult};

/// Default file name of the configuration file.
pub const CONFIG_FILE: &str = "config.toml";

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax; unknown variables are left as written.
fn expand_env_vars(input: &str) -> CliResult<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| CliError::config(format!("invalid expansion pattern: {}", e)))?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string())
}

/// CLI configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Wallet configuration.
    pub wallet: WalletConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Caller-side payment agent settings.
    pub client: ClientConfig,
    /// Outbound HTTP settings.
    pub http: HttpConfig,
    /// Server-side payment settings.
    pub x402: X402Config,
}

impl Default for CliConfig {
    fn default() -> Self {
        let base_dir = default_data_dir();
        Self {
            wallet: WalletConfig::new(&base_dir),
            storage: StorageConfig::new(&base_dir),
            client: ClientConfig::default(),
            http: HttpConfig::default(),
            x402: X402Config::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a file.
    ///
    /// A missing file yields the defaults. `${VAR}` references in the
    /// recipient, contract and resource base are expanded.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;

        config.x402.pay_to = expand_env_vars(&config.x402.pay_to)?;
        config.x402.resource_base = expand_env_vars(&config.x402.resource_base)?;
        if let Some(contract) = config.x402.contract_address.take() {
            config.x402.contract_address = Some(expand_env_vars(&contract)?);
        }

        config
            .x402
            .validate()
            .map_err(|e| CliError::config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Path of the nullifier database.
    pub fn nullifier_db(&self) -> PathBuf {
        self.storage.data_dir.join(NULLIFIER_DB_FILE)
    }
}

/// Wallet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to the hex-encoded wallet key.
    pub keyfile: PathBuf,
}

impl WalletConfig {
    fn new(base_dir: &Path) -> Self {
        Self {
            keyfile: base_dir.join("wallet").join("wallet.key"),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::new(&default_data_dir())
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the nullifier database.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn new(base_dir: &Path) -> Self {
        Self {
            data_dir: base_dir.to_path_buf(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(&default_data_dir())
    }
}

/// Outbound HTTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    default_data_dir().join(CONFIG_FILE)
}
