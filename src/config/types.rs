// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub health: HealthConfig,
    pub forms: FormsConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
    pub access_log: bool,
    /// Access log format (combined, common or json)
    pub access_log_format: String,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    /// Seconds allowed for request headers and for each body read
    pub read_timeout: u64,
    /// Seconds to wait for in-flight requests after a shutdown signal
    pub shutdown_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
}

/// Health check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    /// Enable health check endpoint
    pub enabled: bool,
    /// Liveness probe path (default: /healthz)
    pub liveness_path: String,
}

/// Form endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FormsConfig {
    pub contact_path: String,
    pub driver_path: String,
    /// Per-file upload ceiling in bytes
    pub max_file_size: u64,
    /// Ceiling for all files of one submission together (`max_file_size` if unset)
    #[serde(default)]
    pub max_total_file_size: Option<u64>,
    /// Where uploads are spooled while a request is handled (OS temp dir if unset)
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,
    pub contact_subject: String,
    pub driver_subject: String,
}

impl FormsConfig {
    pub fn max_total_file_size(&self) -> u64 {
        self.max_total_file_size.unwrap_or(self.max_file_size)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
