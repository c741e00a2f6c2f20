//! Configuration loading

mod app_config;

pub use app_config::{
    AppConfig, CounterStoreConfig, GatewayConfig, LogFormat, LoggingConfig, ServerConfig,
};
