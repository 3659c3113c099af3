// Configuration module entry point
// Manages application configuration, mail settings and runtime state

mod mail;
mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use mail::{MailSettings, SettingsError, SmtpSettings, TlsMode};
pub use state::AppState;
pub use types::{
    Config, FormsConfig, HealthConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    ServerConfig,
};

/// Default per-file upload ceiling: 15 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 15 * 1024 * 1024;

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::builder()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FORMRELAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Configuration made of defaults only
    pub fn defaults() -> Result<Self, config::ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder(
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "text")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.shutdown_timeout", 90)?
            .set_default("http.server_name", "formrelay")?
            .set_default("health.enabled", true)?
            .set_default("health.liveness_path", "/healthz")?
            .set_default("forms.contact_path", "/api/contact")?
            .set_default("forms.driver_path", "/api/driver")?
            .set_default("forms.max_file_size", DEFAULT_MAX_FILE_SIZE)?
            .set_default("forms.contact_subject", "New Kids Choice INC. Contact Request")?
            .set_default("forms.driver_subject", "Join Our Team - Driver Application")
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::defaults().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.forms.contact_path, "/api/contact");
        assert_eq!(cfg.forms.driver_path, "/api/driver");
        assert_eq!(cfg.forms.max_file_size, 15_728_640);
        assert_eq!(cfg.forms.max_total_file_size(), 15_728_640);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.forms.upload_dir.is_none());
        assert!(cfg.performance.max_connections.is_none());
    }

    #[test]
    fn test_total_file_size_override() {
        let mut cfg = Config::defaults().unwrap();
        cfg.forms.max_total_file_size = Some(50 * 1024 * 1024);
        assert_eq!(cfg.forms.max_total_file_size(), 52_428_800);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::defaults().unwrap();
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );

        let mut bad = cfg;
        bad.server.host = "not a host".to_string();
        assert!(bad.get_socket_addr().is_err());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let cfg = Config::load_from("definitely/not/here/config").unwrap();
        assert_eq!(cfg.health.liveness_path, "/healthz");
    }
}
