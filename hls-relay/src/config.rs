//! Server configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Interval between self-check probes; zero disables the probe
    pub self_check_interval: Duration,
    /// Timeout of a single self-check probe
    pub self_check_timeout: Duration,
    /// Directory for rotated log files; console-only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            self_check_interval: Duration::from_secs(30),
            self_check_timeout: Duration::from_secs(3),
            log_dir: None,
        }
    }
}

impl ServerConfig {
    /// Load server config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `RELAY_BIND_ADDRESS` (e.g. "0.0.0.0")
    /// - `RELAY_PORT`, then `PORT` (e.g. "8080")
    /// - `RELAY_SELF_CHECK_INTERVAL_SECS` ("0" disables the probe)
    /// - `RELAY_LOG_DIR`
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind_address) = non_empty("RELAY_BIND_ADDRESS") {
            config.bind_address = bind_address.trim().to_string();
        }

        if let Some(port) = non_empty("RELAY_PORT").or_else(|| non_empty("PORT")) {
            match port.trim().parse::<u16>() {
                Ok(parsed) => config.port = parsed,
                Err(e) => warn!(value = %port, error = %e, "Invalid port; keeping default"),
            }
        }

        if let Some(secs) = non_empty("RELAY_SELF_CHECK_INTERVAL_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(parsed) => config.self_check_interval = Duration::from_secs(parsed),
                Err(e) => {
                    warn!(value = %secs, error = %e, "Invalid RELAY_SELF_CHECK_INTERVAL_SECS; keeping default")
                }
            }
        }

        if let Some(dir) = non_empty("RELAY_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }

        config
    }
}
