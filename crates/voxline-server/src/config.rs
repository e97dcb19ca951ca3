//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Operational HTTP endpoint settings.
    #[serde(default)]
    pub ops: OpsConfig,

    /// Audio transport gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Switch control API settings.
    #[serde(default)]
    pub switch: SwitchSection,

    /// Commerce backend settings.
    #[serde(default)]
    pub backend: BackendSection,

    /// Per-call session settings.
    #[serde(default)]
    pub session: SessionSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the operational HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct OpsConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_ops_port")]
    pub port: u16,
}

/// Network and framing configuration for the switch-facing gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port the switch connects to, one TCP connection per call.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// How long a partially received frame may stall before the
    /// connection is dropped, in milliseconds.
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,

    /// Outbound frame queue depth per connection.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// How long an outbound send may wait for queue capacity before the
    /// frame is dropped, in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

/// Switch control API connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SwitchSection {
    /// Base URL of the control API, without a trailing slash.
    #[serde(default = "default_switch_url")]
    pub base_url: String,

    /// Basic auth username.
    #[serde(default = "default_switch_user")]
    pub username: String,

    /// Basic auth password.
    #[serde(default)]
    pub password: String,

    /// Per-request timeout, in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

/// Commerce backend connection and resilience settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    /// Base URL of the commerce API, without a trailing slash.
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Per-request timeout, in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts per operation, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt, in milliseconds; doubles per retry.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Consecutive transient failures that open the circuit breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Open-circuit cooldown before a half-open trial, in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

/// Per-call session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// Queue name for human-operator transfers.
    #[serde(default = "default_operator_queue")]
    pub operator_queue: String,

    /// How long a connection may sit without an identity frame, in
    /// milliseconds.
    #[serde(default = "default_identity_timeout_ms")]
    pub identity_timeout_ms: u64,

    /// Budget for the caller-id lookup, in milliseconds; on expiry the
    /// call proceeds unverified.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voxline_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_ops_port() -> u16 {
    3000
}

fn default_gateway_port() -> u16 {
    7100
}

fn default_frame_timeout_ms() -> u64 {
    5_000
}

fn default_outbound_capacity() -> usize {
    64
}

fn default_write_timeout_ms() -> u64 {
    200
}

fn default_switch_url() -> String {
    "http://localhost:8088/ari".to_string()
}

fn default_switch_user() -> String {
    "voxline".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_http_timeout_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    250
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_cooldown_ms() -> u64 {
    30_000
}

fn default_operator_queue() -> String {
    "support".to_string()
}

fn default_identity_timeout_ms() -> u64 {
    5_000
}

fn default_resolve_timeout_ms() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_ops_port(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_gateway_port(),
            frame_timeout_ms: default_frame_timeout_ms(),
            outbound_capacity: default_outbound_capacity(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl Default for SwitchSection {
    fn default() -> Self {
        Self {
            base_url: default_switch_url(),
            username: default_switch_user(),
            password: String::new(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_ms: default_http_timeout_ms(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            operator_queue: default_operator_queue(),
            identity_timeout_ms: default_identity_timeout_ms(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl SwitchSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl BackendSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl GatewayConfig {
    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl SessionSection {
    pub fn identity_timeout(&self) -> Duration {
        Duration::from_millis(self.identity_timeout_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOXLINE_OPS_PORT` overrides `ops.port`
/// - `VOXLINE_GATEWAY_PORT` overrides `gateway.port`
/// - `VOXLINE_SWITCH_URL` overrides `switch.base_url`
/// - `VOXLINE_SWITCH_USER` overrides `switch.username`
/// - `VOXLINE_SWITCH_PASSWORD` overrides `switch.password`
/// - `VOXLINE_BACKEND_URL` overrides `backend.base_url`
/// - `VOXLINE_OPERATOR_QUEUE` overrides `session.operator_queue`
/// - `VOXLINE_LOG_LEVEL` overrides `logging.level`
/// - `VOXLINE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Applies environment overrides through a lookup function, so tests can
/// exercise the override logic without touching the process environment.
fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(port) = var("VOXLINE_OPS_PORT").and_then(|v| v.parse().ok()) {
        config.ops.port = port;
    }
    if let Some(port) = var("VOXLINE_GATEWAY_PORT").and_then(|v| v.parse().ok()) {
        config.gateway.port = port;
    }
    if let Some(url) = var("VOXLINE_SWITCH_URL") {
        config.switch.base_url = url;
    }
    if let Some(user) = var("VOXLINE_SWITCH_USER") {
        config.switch.username = user;
    }
    if let Some(password) = var("VOXLINE_SWITCH_PASSWORD") {
        config.switch.password = password;
    }
    if let Some(url) = var("VOXLINE_BACKEND_URL") {
        config.backend.base_url = url;
    }
    if let Some(queue) = var("VOXLINE_OPERATOR_QUEUE") {
        config.session.operator_queue = queue;
    }
    if let Some(level) = var("VOXLINE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("VOXLINE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_no_file_given() {
        let config = load_config(None).unwrap();
        assert_eq!(config.ops.port, 3000);
        assert_eq!(config.gateway.port, 7100);
        assert_eq!(config.session.operator_queue, "support");
        assert_eq!(config.backend.max_attempts, 3);
        assert!(!config.logging.json);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/voxline.toml")).unwrap();
        assert_eq!(config.ops.port, 3000);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[gateway]
port = 7200
outbound_capacity = 16

[switch]
base_url = "http://pbx.internal:8088/ari"
password = "hunter2"

[session]
operator_queue = "retail-operators"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.gateway.port, 7200);
        assert_eq!(config.gateway.outbound_capacity, 16);
        assert_eq!(config.switch.base_url, "http://pbx.internal:8088/ari");
        assert_eq!(config.switch.password, "hunter2");
        assert_eq!(config.session.operator_queue, "retail-operators");
        // Untouched sections keep their defaults.
        assert_eq!(config.backend.failure_threshold, 5);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gateway\nport = not-a-number").unwrap();
        assert!(matches!(
            load_config(Some(file.path().to_str().unwrap())),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_win_over_defaults() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| match name {
            "VOXLINE_GATEWAY_PORT" => Some("7300".to_string()),
            "VOXLINE_BACKEND_URL" => Some("http://shop.internal".to_string()),
            "VOXLINE_LOG_JSON" => Some("true".to_string()),
            _ => None,
        });
        assert_eq!(config.gateway.port, 7300);
        assert_eq!(config.backend.base_url, "http://shop.internal");
        assert!(config.logging.json);
    }

    #[test]
    fn unparseable_env_port_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| match name {
            "VOXLINE_OPS_PORT" => Some("eighty".to_string()),
            _ => None,
        });
        assert_eq!(config.ops.port, 3000);
    }
}
