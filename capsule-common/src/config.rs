//! Configuration loading for the Capsule Radio proxy service
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (--port, --bind, --config)
//! 2. Environment variables (B2_KEY_ID, B2_APPLICATION_KEY, B2_BUCKET_ID,
//!    B2_BUCKET_NAME, CAPSULE_CONFIG)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! CLI overrides are applied by the binary; this module covers 2 to 4.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CAPSULE_CONFIG";

/// Default HTTP port of the proxy service
pub const DEFAULT_PORT: u16 = 5780;

/// Default Backblaze B2 API endpoint
pub const DEFAULT_B2_API_BASE_URL: &str = "https://api.backblazeb2.com";

/// Environment variables that must resolve to a non-empty value
pub const REQUIRED_B2_ENV_VARS: [&str; 4] = [
    "B2_KEY_ID",
    "B2_APPLICATION_KEY",
    "B2_BUCKET_ID",
    "B2_BUCKET_NAME",
];

/// Bootstrap configuration loaded from TOML
///
/// Read once at startup; restart the service to pick up changes.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Address to bind the HTTP listener to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// HTTP server port
    ///
    /// Default: 5780
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Storage credentials and endpoint
    #[serde(default)]
    pub b2: B2Settings,

    /// Outbound request policy
    #[serde(default)]
    pub http: HttpSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Backblaze B2 settings
#[derive(Debug, Clone, Deserialize)]
pub struct B2Settings {
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub application_key: Option<String>,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub bucket_name: Option<String>,
    /// Base URL for `b2_authorize_account`
    #[serde(default = "default_b2_api_base_url")]
    pub api_base_url: String,
}

/// Timeout and retry policy for upstream requests
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// Extra attempts after the first
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Per-attempt timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Delay before retry `n` is `backoff_base_ms * 2^n`
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

/// Complete set of B2 credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct B2Credentials {
    pub key_id: String,
    pub application_key: String,
    pub bucket_id: String,
    pub bucket_name: String,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_b2_api_base_url() -> String {
    DEFAULT_B2_API_BASE_URL.to_string()
}

fn default_retries() -> u32 {
    2
}

fn default_timeout_ms() -> u64 {
    8_000
}

fn default_backoff_base_ms() -> u64 {
    200
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            logging: LoggingConfig::default(),
            b2: B2Settings::default(),
            http: HttpSettings::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for B2Settings {
    fn default() -> Self {
        Self {
            key_id: None,
            application_key: None,
            bucket_id: None,
            bucket_name: None,
            api_base_url: default_b2_api_base_url(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            timeout_ms: default_timeout_ms(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl B2Settings {
    /// Resolve every credential, failing on the first missing one with
    /// `Missing <ENV_VAR>`.
    pub fn credentials(&self) -> Result<B2Credentials> {
        fn require(value: &Option<String>, name: &str) -> Result<String> {
            match value.as_deref() {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(Error::MissingSetting(name.to_string())),
            }
        }

        Ok(B2Credentials {
            key_id: require(&self.key_id, "B2_KEY_ID")?,
            application_key: require(&self.application_key, "B2_APPLICATION_KEY")?,
            bucket_id: require(&self.bucket_id, "B2_BUCKET_ID")?,
            bucket_name: require(&self.bucket_name, "B2_BUCKET_NAME")?,
        })
    }

    fn slot_mut(&mut self, env_var: &str) -> Option<&mut Option<String>> {
        match env_var {
            "B2_KEY_ID" => Some(&mut self.key_id),
            "B2_APPLICATION_KEY" => Some(&mut self.application_key),
            "B2_BUCKET_ID" => Some(&mut self.bucket_id),
            "B2_BUCKET_NAME" => Some(&mut self.bucket_name),
            _ => None,
        }
    }

    fn slot(&self, env_var: &str) -> Option<&Option<String>> {
        match env_var {
            "B2_KEY_ID" => Some(&self.key_id),
            "B2_APPLICATION_KEY" => Some(&self.application_key),
            "B2_BUCKET_ID" => Some(&self.bucket_id),
            "B2_BUCKET_NAME" => Some(&self.bucket_name),
            _ => None,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the TOML layer, then apply environment overrides.
    ///
    /// An explicitly named file (`cli_path` or `CAPSULE_CONFIG`) must exist.
    /// The platform default location is optional.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let explicit = cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::load_file(&path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    info!("Loading config from {}", path.display());
                    Self::load_file(&path)?
                }
                _ => {
                    debug!("No config file found, using built-in defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Overlay B2 settings with non-empty values from `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for name in REQUIRED_B2_ENV_VARS {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                if let Some(slot) = self.b2.slot_mut(name) {
                    *slot = Some(value);
                }
            }
        }
    }

    /// Names of the required B2 settings that are still missing
    pub fn missing_b2_settings(&self) -> Vec<&'static str> {
        REQUIRED_B2_ENV_VARS
            .into_iter()
            .filter(|name| {
                !matches!(self.b2.slot(name), Some(Some(v)) if !v.is_empty())
            })
            .collect()
    }
}

/// `<config_dir>/capsule-radio/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("capsule-radio").join("config.toml"))
}
