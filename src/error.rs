//! Framework error types.

use thiserror::Error;

/// Startup configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required keys are absent or empty
    #[error("required environment keys missing or empty: {}", .0.join(", "))]
    MissingKeys(Vec<&'static str>),

    /// A key holds a value outside its allowed set or format
    #[error("invalid value '{value}' for {key} (expected {expected})")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: String,
    },

    /// The `.env` file or settings file could not be read
    #[error("failed to load configuration: {0}")]
    Load(String),
}

#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Mail request is missing required fields
    #[error("the following fields are missing: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// The mail transport reported a failure
    #[error("mail transport error: {0}")]
    Transport(String),

    /// MX or address lookup for direct delivery failed
    #[error("mail target resolution failed: {0}")]
    Resolve(String),

    /// AJAX action requested without a registered handler
    #[error("no AJAX handler is registered")]
    MissingHandler,

    #[error("mod '{action}' failed: {message}")]
    Mod { action: String, message: String },

    #[error("template '{path}' failed to render: {message}")]
    Template { path: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_are_listed() {
        let e = ConfigError::MissingKeys(vec!["DB_HOST", "THEME"]);
        assert_eq!(
            e.to_string(),
            "required environment keys missing or empty: DB_HOST, THEME"
        );
    }

    #[test]
    fn validation_names_fields() {
        let e = FrameworkError::Validation {
            missing: vec!["subject", "reply_to"],
        };
        assert!(e.to_string().ends_with("subject, reply_to"));
    }

    #[test]
    fn config_error_converts() {
        let e: FrameworkError = ConfigError::Load("no file".into()).into();
        assert!(e.to_string().contains("no file"));
    }
}
