use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub hospital_api: HospitalApiConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Async runtime worker threads for the single server process
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Flush stdout after every log event
    pub unbuffered: bool,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Upstream Hospital Directory settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HospitalApiConfig {
    pub base_url: String,
    /// Maximum rows accepted in one upload
    pub max_hospitals: usize,
    pub timeout_seconds: f64,
}

/// Prometheus metrics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            unbuffered: false,
        }
    }
}

impl Default for HospitalApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hospital-directory.onrender.com".to_string(),
            max_hospitals: 20,
            timeout_seconds: 30.0,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl HospitalApiConfig {
    /// Request timeout; non-positive or non-finite values fall back to the default
    pub fn timeout(&self) -> std::time::Duration {
        if self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0 {
            std::time::Duration::from_secs_f64(self.timeout_seconds)
        } else {
            std::time::Duration::from_secs_f64(Self::default().timeout_seconds)
        }
    }
}

/// Values from the unprefixed deployment variables
/// (`HOSPITAL_API_BASE`, `MAX_HOSPITALS`, `HTTPX_TIMEOUT_SECONDS`).
/// Unparsable values are dropped so the layered default applies.
#[derive(Debug, Default, PartialEq)]
struct LegacyOverrides {
    base_url: Option<String>,
    max_hospitals: Option<i64>,
    timeout_seconds: Option<f64>,
}

impl LegacyOverrides {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup("HOSPITAL_API_BASE").filter(|v| !v.trim().is_empty()),
            max_hospitals: lookup("MAX_HOSPITALS")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v > 0),
            timeout_seconds: lookup("HTTPX_TIMEOUT_SECONDS")
                .and_then(|v| v.trim().parse::<f64>().ok()),
        }
    }
}

impl AppConfig {
    /// Layer `config/default`, `config/local`, `APP__*` variables, then the
    /// unprefixed deployment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let legacy = LegacyOverrides::from_lookup(|key| std::env::var(key).ok());
        Self::load_from(Self::environment(), legacy)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn load_from(
        environment: config::Environment,
        legacy: LegacyOverrides,
    ) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(environment)
            .set_override_option("hospital_api.base_url", legacy.base_url)?
            .set_override_option("hospital_api.max_hospitals", legacy.max_hospitals)?
            .set_override_option("hospital_api.timeout_seconds", legacy.timeout_seconds)?
            .build()?;

        config.try_deserialize()
    }
}
