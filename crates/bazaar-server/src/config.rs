//! Server configuration.
//!
//! Loaded from `bazaar.toml` (or a `.json` file) with every section
//! defaulted, then overridden from `BAZAAR_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bazaar_commerce::order::OrderSettings;
use bazaar_commerce::Money;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "bazaar.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub uploads: UploadConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub orders: OrdersConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Load `path`, or `bazaar.toml` when present, or defaults; then apply
    /// environment overrides.
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `BAZAAR_HOST`, `BAZAAR_PORT`, `BAZAAR_DATA_DIR` and
    /// `BAZAAR_UPLOAD_DIR`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("BAZAAR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("BAZAAR_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!("Invalid BAZAAR_PORT value {port:?}: {e}"),
            }
        }
        if let Some(dir) = var("BAZAAR_DATA_DIR") {
            self.database.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = var("BAZAAR_UPLOAD_DIR") {
            self.uploads.dir = PathBuf::from(dir);
        }
    }
}

/// Listener address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where documents live. Without a data directory everything is in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Cookie carrying the session token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: u64,

    /// Return password reset tokens in the API response. There is no mail
    /// delivery, so this is how a deployment hands tokens out.
    #[serde(default)]
    pub expose_reset_token: bool,
}

fn default_cookie_name() -> String {
    "token".to_string()
}

fn default_session_ttl_days() -> u64 {
    7
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            session_ttl_days: default_session_ttl_days(),
            expose_reset_token: false,
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_days.max(1) * 24 * 60 * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_max_avatar_bytes")]
    pub max_avatar_bytes: usize,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_avatar_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_avatar_bytes: default_max_avatar_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Products per page on the listing endpoint.
    #[serde(default = "default_products_per_page")]
    pub products_per_page: usize,
}

fn default_products_per_page() -> usize {
    2
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            products_per_page: default_products_per_page(),
        }
    }
}

/// Checkout pricing, in rupees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    #[serde(default = "default_tax_rate")]
    pub tax_rate_percent: f64,

    #[serde(default = "default_shipping_fee")]
    pub shipping_fee: f64,

    /// Item totals at or above this ship free. Unset disables free shipping.
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Option<f64>,
}

fn default_tax_rate() -> f64 {
    18.0
}

fn default_shipping_fee() -> f64 {
    40.0
}

fn default_free_shipping_threshold() -> Option<f64> {
    Some(500.0)
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: default_tax_rate(),
            shipping_fee: default_shipping_fee(),
            free_shipping_threshold: default_free_shipping_threshold(),
        }
    }
}

impl OrdersConfig {
    pub fn settings(&self) -> OrderSettings {
        OrderSettings {
            tax_rate_percent: self.tax_rate_percent.max(0.0),
            shipping_fee: Money::from_decimal(self.shipping_fee.max(0.0)),
            free_shipping_threshold: self.free_shipping_threshold.map(Money::from_decimal),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    Json,
    /// Human-readable format (for development).
    #[default]
    Human,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("[server]\nport = 8080\n").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.catalog.products_per_page, 2);
        assert_eq!(config.auth.cookie_name, "token");
        assert_eq!(config.uploads.max_avatar_bytes, 2 * 1024 * 1024);
        assert!(config.database.data_dir.is_none());
        assert_eq!(config.logging.format, LogFormat::Human);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BAZAAR_PORT", "9999"),
            ("BAZAAR_DATA_DIR", "/var/lib/bazaar"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.port, 9999);
        assert_eq!(
            config.database.data_dir.as_deref(),
            Some(Path::new("/var/lib/bazaar"))
        );

        let mut config = Config::default();
        config.apply_env(|k| (k == "BAZAAR_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("bazaar.json");
        std::fs::write(&json_path, r#"{"logging": {"format": "json"}}"#).unwrap();
        let config = Config::load(json_path.to_str().unwrap()).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);

        let toml_path = dir.path().join("bazaar.toml");
        std::fs::write(&toml_path, "[orders]\ntax_rate_percent = 5.0\n").unwrap();
        let config = Config::load(toml_path.to_str().unwrap()).unwrap();
        assert_eq!(config.orders.settings().tax_rate_percent, 5.0);
        assert_eq!(config.orders.shipping_fee, 40.0);

        assert!(Config::load("/nonexistent/bazaar.toml").is_err());
    }
}
