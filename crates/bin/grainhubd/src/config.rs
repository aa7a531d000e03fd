//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `grainhub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use grainhub_adapter_mqtt::config::MqttConfig;
use grainhub_app::services::dispatcher::DispatcherConfig;
use grainhub_app::services::reconciler::ReconcilerConfig;
use grainhub_domain::command::{DEFAULT_AUTO_INTERVAL_SECS, DEFAULT_NAMESPACE};
use grainhub_domain::device::DeviceCode;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// MQTT broker settings.
    pub mqtt: MqttConfig,
    /// Background reconciliation settings.
    pub scheduler: SchedulerConfig,
    /// Dispatch defaults (topic namespace, default device).
    pub dispatch: DispatchConfig,
    /// Bearer-token verification settings.
    pub auth: AuthConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Background reconciliation cadence.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run the periodic cycle inside the daemon. `/check_timers` works
    /// either way.
    pub enabled: bool,
    /// Seconds between cycles.
    pub interval_secs: u64,
}

/// Dispatch defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Topic namespace commands are published under.
    pub namespace: String,
    /// Device addressed when a request carries no device code.
    pub default_device: String,
    /// `time_interval` sent with a start-auto command, in seconds.
    pub auto_interval_secs: u32,
}

/// Bearer-token verification.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 shared secret; unset disables verification (every request is
    /// audited as anonymous).
    pub jwt_secret: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `grainhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("grainhub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GRAINHUB_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("GRAINHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("GRAINHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("GRAINHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("GRAINHUB_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("GRAINHUB_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Ok(val) = std::env::var("GRAINHUB_NAMESPACE") {
            self.dispatch.namespace = val;
        }
        if let Ok(val) = std::env::var("GRAINHUB_DEFAULT_DEVICE") {
            self.dispatch.default_device = val;
        }
        if let Ok(val) = std::env::var("GRAINHUB_SCHEDULER_INTERVAL") {
            if let Ok(secs) = val.parse() {
                self.scheduler.interval_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("GRAINHUB_JWT_SECRET") {
            self.auth.jwt_secret = Some(val);
        }
        if let Ok(val) = std::env::var("GRAINHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scheduler interval must be non-zero".to_string(),
            ));
        }
        if self.dispatch.namespace.is_empty() {
            return Err(ConfigError::Validation(
                "dispatch namespace must not be empty".to_string(),
            ));
        }
        if DeviceCode::new(self.dispatch.default_device.clone()).is_err() {
            return Err(ConfigError::Validation(
                "default device code must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Reconciler settings derived from this configuration.
    #[must_use]
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            namespace: self.dispatch.namespace.clone(),
            auto_interval_secs: self.dispatch.auto_interval_secs,
        }
    }

    /// Dispatcher settings derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the default device code is
    /// empty (already rejected by [`Config::load`]).
    pub fn dispatcher_config(&self) -> Result<DispatcherConfig, ConfigError> {
        let default_device = DeviceCode::new(self.dispatch.default_device.clone())
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(DispatcherConfig {
            namespace: self.dispatch.namespace.clone(),
            default_device,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:grainhub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_device: "mm000000".to_string(),
            auto_interval_secs: DEFAULT_AUTO_INTERVAL_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "grainhubd=info,grainhub=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
