use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub counter_store: CounterStoreConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Counter store (Redis) settings
#[derive(Debug, Clone, Deserialize)]
pub struct CounterStoreConfig {
    pub url: String,
    pub key_prefix: Option<String>,
    /// Per-operation timeout in milliseconds.
    pub op_timeout_ms: u64,
}

/// Admission gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// The shared demo bearer constant.
    pub demo_key: String,
    /// Secret for the key payload cipher.
    pub cipher_secret: String,
    /// Name of the entitlement template applied to demo traffic.
    pub demo_template: String,
    /// Plan cache capacity (entries).
    pub plan_cache_capacity: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            counter_store: CounterStoreConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CounterStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            op_timeout_ms: 2_000,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            demo_key: "demo".to_string(),
            cipher_secret: "development-only-secret".to_string(),
            demo_template: "default".to_string(),
            plan_cache_capacity: 10_000,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
