//! Obscura Configuration
//!
//! Shared configuration crate for all Obscura components.
//!
//! Handles loading configuration from:
//! 1. OBS_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.obscura/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<ObscuraConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".obscura";

// ============================================================================
// Default Constants (avoid repeated allocations)
// ============================================================================

const DEFAULT_PORT: u16 = 8080;

const DEFAULT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_REQUEST_TTL_SECS: u64 = 3600;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
const DEFAULT_ORACLE_DELAY_MS: u64 = 250;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObscuraConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Ledger service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Minimum seconds between consecutive submissions (and, on its own
    /// clock, consecutive analysis requests) per address
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Seconds a pending decryption request lives before the sweep
    /// expires it
    #[serde(default = "default_request_ttl_secs")]
    pub request_ttl_secs: u64,
    /// Expiry sweep period
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Owner address (hex or base58); dev mode derives one if unset
    #[serde(default)]
    pub owner: Option<String>,
    /// Instance identity folded into every state hash; dev mode derives
    /// one if unset
    #[serde(default)]
    pub instance: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            request_ttl_secs: DEFAULT_REQUEST_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            owner: None,
            instance: None,
        }
    }
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}
fn default_request_ttl_secs() -> u64 {
    DEFAULT_REQUEST_TTL_SECS
}
fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

/// Decryption oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Trusted callback address (hex or base58). Required outside dev
    /// mode; dev mode uses the in-process oracle's address.
    #[serde(default)]
    pub address: Option<String>,
    /// Dev oracle callback delay
    #[serde(default = "default_oracle_delay_ms")]
    pub delay_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            address: None,
            delay_ms: DEFAULT_ORACLE_DELAY_MS,
        }
    }
}

fn default_oracle_delay_ms() -> u64 {
    DEFAULT_ORACLE_DELAY_MS
}

/// Feature flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub dev_mode: bool,
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

/// Check if env var is set to a truthy value ("1" or "true")
fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Implementation
// ============================================================================

impl ObscuraConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check OBS_CONFIG env var
        if let Ok(path) = env::var("OBS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.obscura/config.toml
        dirs::home_dir()
            .map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // API
        env_parse("OBS_API_PORT", &mut self.api.port);

        // Service
        env_parse("OBS_COOLDOWN_SECS", &mut self.service.cooldown_secs);
        env_parse("OBS_REQUEST_TTL_SECS", &mut self.service.request_ttl_secs);
        env_parse(
            "OBS_SWEEP_INTERVAL_SECS",
            &mut self.service.sweep_interval_secs,
        );
        env_option_string("OBS_OWNER", &mut self.service.owner);
        env_option_string("OBS_INSTANCE", &mut self.service.instance);

        // Oracle
        env_option_string("OBS_ORACLE_ADDRESS", &mut self.oracle.address);
        env_parse("OBS_ORACLE_DELAY_MS", &mut self.oracle.delay_ms);

        // Features
        if let Some(v) = env_bool("DEV_MODE") {
            self.features.dev_mode = v;
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.features.dev_mode = true;
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// This is the recommended way to access config in most code.
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static ObscuraConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static ObscuraConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: ObscuraConfig) -> Result<(), ObscuraConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `ObscuraConfig::global()`.
#[inline]
pub fn global_config() -> &'static ObscuraConfig {
    ObscuraConfig::global()
}

// ============================================================================
// Parsed Config (lazy-initialized constants)
// ============================================================================

use obscura_account::Address;
use std::str::FromStr;
use std::sync::LazyLock;

/// Pre-parsed service configuration - access fields directly like a constant.
///
/// # Example
/// ```ignore
/// use obscura_config::SERVICE;
///
/// let cooldown = SERVICE.cooldown_secs;   // u64 - no function call!
/// let owner = SERVICE.owner;              // Option<Address> (pre-parsed)
/// ```
pub static SERVICE: LazyLock<ServiceRuntime> = LazyLock::new(|| {
    let cfg = ObscuraConfig::global();
    ServiceRuntime {
        cooldown_secs: cfg.service.cooldown_secs,
        request_ttl_secs: cfg.service.request_ttl_secs,
        sweep_interval_secs: cfg.service.sweep_interval_secs,
        owner: cfg
            .service
            .owner
            .as_deref()
            .map(|s| Address::from_str(s).expect("Invalid owner address in config")),
        instance: cfg
            .service
            .instance
            .as_deref()
            .map(|s| Address::from_str(s).expect("Invalid instance address in config")),
    }
});

/// Pre-parsed service configuration with `Address` fields.
pub struct ServiceRuntime {
    pub cooldown_secs: u64,
    pub request_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    /// Owner address (pre-parsed, if configured)
    pub owner: Option<Address>,
    /// Instance identity (pre-parsed, if configured)
    pub instance: Option<Address>,
}

/// Pre-parsed oracle configuration.
pub static ORACLE: LazyLock<OracleRuntime> = LazyLock::new(|| {
    let cfg = ObscuraConfig::global();
    OracleRuntime {
        address: cfg
            .oracle
            .address
            .as_deref()
            .map(|s| Address::from_str(s).expect("Invalid oracle address in config")),
        delay_ms: cfg.oracle.delay_ms,
    }
});

pub struct OracleRuntime {
    /// Trusted callback address (pre-parsed, if configured)
    pub address: Option<Address>,
    pub delay_ms: u64,
}

// ============================================================================
// Tests
// ============================================================================
