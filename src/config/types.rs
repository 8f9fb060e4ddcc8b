// Configuration types module
// Defines the server settings file structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub app: AppConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Application layout and front controller settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Directory holding `.env`, `app/` and the DKIM key directory
    pub root_path: PathBuf,
    /// Public base URL handed to templates and mods
    pub web_root: String,
    pub default_action: String,
    /// Template file extension, without the dot
    pub template_ext: String,
    /// DKIM private keys live in `<root_path>/<dkim_key_dir>/`
    pub dkim_key_dir: String,
    /// URL prefix under which theme assets are served
    pub assets_prefix: String,
    pub session_cookie: String,
    /// Session files live in `<root_path>/<session_dir>/<session id>`
    pub session_dir: String,
    /// Built-in mods bound to extra actions for one theme: theme, then action, then mod name
    #[serde(default)]
    pub theme_mods: HashMap<String, HashMap<String, String>>,
    /// How the built-in contact mod delivers mail
    #[serde(default)]
    pub mail_delivery: MailDelivery,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailDelivery {
    /// Through the configured SMTP host
    #[default]
    Relay,
    /// Straight to the recipient's MX host
    Direct,
}
