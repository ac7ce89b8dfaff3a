use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub resolver: ResolverConfig,
    pub proxy: ProxyConfig,
    pub network: NetworkConfig,
    pub admin: AdminConfig,
    pub alert: AlertConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Resolution engine configuration
///
/// `endpoints` is a comma-separated list of legacy endpoint-template URLs;
/// `connectors_json` is a JSON array of connector definitions. Both are kept
/// as raw strings here and parsed leniently at service construction so that a
/// malformed value degrades to an empty backend list instead of failing
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub endpoints: String,
    pub connectors_json: String,
    pub cache_ttl_secs: u64,
    pub health_check_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoints: String::new(),
            connectors_json: String::new(),
            cache_ttl_secs: 3600,
            health_check_interval_secs: 600,
            request_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Comma-separated host allow-list; empty allows any host.
    pub allow_hosts: String,
    pub manifest_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_hosts: String::new(),
            manifest_timeout_secs: 15,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Newline-separated User-Agent pool; empty uses the built-in pool.
    pub user_agent_pool: String,
    /// JSON array of outbound gateway definitions.
    pub gateways_json: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Shared secret for `X-Admin-Password`; empty disables admin routes.
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Webhook URL for resolution-failure alerts; empty disables alerting.
    pub webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: String,
    pub top_n: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "data/catalog.json".to_string(),
            top_n: 20,
        }
    }
}

impl Config {
    /// Load configuration from a file, overlaid with environment variables.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        ConfigBuilder::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("RAKAS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigBuilder::builder()
            .add_source(Environment::with_prefix("RAKAS").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}

/// Load configuration from config file or environment variables
///
/// Config file search order:
/// 1. RAKAS_CONFIG_PATH environment variable (explicit path)
/// 2. ./config.yaml (current working directory)
/// 3. Fall back to environment variables only
pub fn load_config() -> Config {
    let config_path = std::env::var("RAKAS_CONFIG_PATH")
        .ok()
        .filter(|p| Path::new(p).exists())
        .or_else(|| {
            let cwd = "config.yaml";
            Path::new(cwd).exists().then(|| cwd.to_string())
        });

    if let Some(path) = config_path {
        match Config::from_file(&path) {
            Ok(cfg) => {
                eprintln!("Loaded config from {path}");
                return cfg;
            }
            Err(e) => {
                eprintln!("Failed to load {path}: {e}");
                eprintln!("Falling back to environment variables");
            }
        }
    }

    Config::from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load config from environment: {e}");
        eprintln!("Using default configuration");
        Config::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.server.http_port, 8080);
        assert_eq!(cfg.resolver.cache_ttl_secs, 3600);
        assert_eq!(cfg.resolver.health_check_interval_secs, 600);
        assert_eq!(cfg.catalog.top_n, 20);
        assert!(cfg.admin.password.is_empty());
    }

    #[test]
    fn http_address_joins_host_and_port() {
        let mut cfg = Config::default();
        cfg.server.host = "127.0.0.1".to_string();
        cfg.server.http_port = 9000;
        assert_eq!(cfg.http_address(), "127.0.0.1:9000");
    }
}
