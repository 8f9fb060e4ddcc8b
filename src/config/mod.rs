// Configuration module entry point
// Manages the server settings file, the validated environment and runtime state

pub mod env;
mod state;
mod types;

use std::net::SocketAddr;
use std::path::Path;

use crate::error::ConfigError;

// Re-export public types
pub use env::{DatabaseSettings, EnvSettings, SmtpSecurity};
pub use state::AppState;
pub use types::{Config, MailDelivery};

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; `OWP_`-prefixed environment variables override it,
    /// e.g. `OWP_SERVER__PORT=9000`.
    pub fn load_from(config_path: &str, root_path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("OWP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")
            .and_then(|b| b.set_default("server.port", 8080))
            .and_then(|b| b.set_default("logging.level", "info"))
            .and_then(|b| b.set_default("logging.access_log", true))
            .and_then(|b| b.set_default("performance.keep_alive_timeout", 75))
            .and_then(|b| b.set_default("performance.read_timeout", 30))
            .and_then(|b| b.set_default("performance.write_timeout", 30))
            .and_then(|b| b.set_default("http.server_name", "OpenWebPresence/1.0"))
            .and_then(|b| b.set_default("http.enable_cors", false))
            .and_then(|b| b.set_default("http.max_body_size", 10_485_760)) // 10MB
            .and_then(|b| b.set_default("app.root_path", root_path.to_string_lossy().into_owned()))
            .and_then(|b| b.set_default("app.web_root", "/"))
            .and_then(|b| b.set_default("app.default_action", "home"))
            .and_then(|b| b.set_default("app.template_ext", "hbs"))
            .and_then(|b| b.set_default("app.dkim_key_dir", "dkim"))
            .and_then(|b| b.set_default("app.assets_prefix", "/assets"))
            .and_then(|b| b.set_default("app.session_cookie", "owp_session"))
            .and_then(|b| b.set_default("app.session_dir", "sessions"))
            .and_then(|b| b.build())
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
