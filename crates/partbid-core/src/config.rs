//! Configuration resolution for `PartBid`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/partbid/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete `PartBid` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "partbid_server=info,partbid_core=info".to_string(),
            log_json: false,
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime (seconds). Default: 24 hours.
    pub access_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            access_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Marketplace behaviour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Prefix of generated auction codes (`AUC-00001`).
    pub auction_code_prefix: String,
    /// Default number of activity log entries returned when no limit is given.
    pub activity_limit: usize,
    /// Populate an empty store with demo accounts and auctions at startup.
    pub seed_demo_data: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            auction_code_prefix: "AUC".to_string(),
            activity_limit: 20,
            seed_demo_data: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` is a config file named on the command line; unlike the global
/// file it must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config = load_config_file(&global_path)?;
        }
    }

    if let Some(path) = explicit {
        config = load_config_file(path)?;
    }

    apply_env_overrides(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".partbid").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/partbid/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("partbid").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Read one settings file. Sections and fields it omits keep their defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("PARTBID_ADDR") {
        if let Ok(addr) = val.parse() {
            config.server.addr = addr;
        }
    }
    if let Ok(val) = std::env::var("PARTBID_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Ok(val) = std::env::var("PARTBID_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Ok(val) = std::env::var("PARTBID_ACCESS_TTL_SECS") {
        if let Ok(n) = val.parse() {
            config.auth.access_ttl_secs = n;
        }
    }
    if let Ok(val) = std::env::var("PARTBID_SEED_DEMO") {
        config.market.seed_demo_data = matches!(val.as_str(), "1" | "true" | "yes");
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.auth.jwt_secret.is_empty() {
        return Err(Error::Config("auth.jwt_secret must not be empty".into()));
    }
    if config.auth.access_ttl_secs <= 0 {
        return Err(Error::Config("auth.access_ttl_secs must be positive".into()));
    }
    if config.market.auction_code_prefix.trim().is_empty() {
        return Err(Error::Config(
            "market.auction_code_prefix must not be empty".into(),
        ));
    }
    Ok(())
}
