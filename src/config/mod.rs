//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, HospitalApiConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig,
};
