//! Environment settings
//!
//! Loads `.env` from the application root and validates the keys the
//! framework depends on. The result is an immutable [`EnvSettings`] that is
//! handed to every component by reference.

#[cfg(test)]
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::ConfigError;

const DATABASE_KEYS: [&str; 4] = ["DB_HOST", "DB_NAME", "DB_USER", "DB_PASS"];
const THEME_KEYS: [&str; 1] = ["THEME"];
const SMTP_KEYS: [&str; 5] = [
    "smtp_hostname",
    "smtp_auth",
    "smtp_username",
    "smtp_password",
    "smtp_port",
];
const DKIM_KEYS: [&str; 5] = [
    "DKIM_domain",
    "DKIM_private",
    "DKIM_selector",
    "DKIM_passphrase",
    "DKIM_identity",
];

/// Transport security requested for SMTP connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS
    Ssl,
    /// STARTTLS upgrade
    Tls,
    None,
}

impl SmtpSecurity {
    pub const ALLOWED: [&'static str; 3] = ["ssl", "tls", "none"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ssl" => Some(Self::Ssl),
            "tls" => Some(Self::Tls),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ssl => "ssl",
            Self::Tls => "tls",
            Self::None => "none",
        }
    }
}

impl fmt::Display for SmtpSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct SmtpSettings {
    pub hostname: String,
    pub auth: bool,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub security: SmtpSecurity,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("hostname", &self.hostname)
            .field("auth", &self.auth)
            .field("username", &self.username)
            .field("password", &"***")
            .field("port", &self.port)
            .field("security", &self.security)
            .finish()
    }
}

#[derive(Clone)]
pub struct DkimSettings {
    pub domain: String,
    /// Key file name (without extension) inside the DKIM key directory
    pub private_key: String,
    pub selector: String,
    pub passphrase: String,
    pub identity: String,
}

impl fmt::Debug for DkimSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DkimSettings")
            .field("domain", &self.domain)
            .field("private_key", &self.private_key)
            .field("selector", &self.selector)
            .field("passphrase", &"***")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Validated environment, immutable after startup
#[derive(Debug, Clone)]
pub struct EnvSettings {
    pub database: DatabaseSettings,
    pub theme: String,
    /// Development mode (`ISDEV`), enables the grouped debug log
    pub is_dev: bool,
    pub smtp: SmtpSettings,
    pub dkim: DkimSettings,
}

/// Load `<root>/.env` into the process environment
///
/// Variables already present in the process win over the file. A missing file
/// is not an error here; validation reports whatever is still absent.
pub fn load_dotenv(root: &Path) -> Result<(), ConfigError> {
    let path = root.join(".env");
    if !path.is_file() {
        return Ok(());
    }
    dotenvy::from_path(&path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))
}

impl EnvSettings {
    /// Build settings from the process environment
    pub fn from_process_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a key/value map
    #[cfg(test)]
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Validate and build settings from an arbitrary key lookup
    ///
    /// Every absent or empty required key is reported in one error, in
    /// declaration order.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<&'static str> = DATABASE_KEYS
            .iter()
            .chain(THEME_KEYS.iter())
            .chain(SMTP_KEYS.iter())
            .chain(DKIM_KEYS.iter())
            .copied()
            .filter(|key| lookup(*key).is_none_or(|v| v.trim().is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        let get = |key: &str| lookup(key).unwrap_or_default();

        let secure = lookup("smtp_secure").unwrap_or_default();
        let security = SmtpSecurity::parse(secure.trim()).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "smtp_secure",
                value: secure.clone(),
                expected: format!("one of {}", SmtpSecurity::ALLOWED.join(", ")),
            }
        })?;

        let port_raw = get("smtp_port");
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "smtp_port",
                value: port_raw.clone(),
                expected: "a port number".to_string(),
            })?;

        let auth_raw = get("smtp_auth");
        let auth = parse_flag(&auth_raw).ok_or_else(|| ConfigError::InvalidValue {
            key: "smtp_auth",
            value: auth_raw.clone(),
            expected: "a boolean flag".to_string(),
        })?;

        let is_dev = lookup("ISDEV")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .is_some_and(|v| v != 0);

        Ok(Self {
            database: DatabaseSettings {
                host: get("DB_HOST"),
                name: get("DB_NAME"),
                user: get("DB_USER"),
                password: get("DB_PASS"),
            },
            theme: get("THEME"),
            is_dev,
            smtp: SmtpSettings {
                hostname: get("smtp_hostname"),
                auth,
                username: get("smtp_username"),
                password: get("smtp_password"),
                port,
                security,
            },
            dkim: DkimSettings {
                domain: get("DKIM_domain"),
                private_key: get("DKIM_private"),
                selector: get("DKIM_selector"),
                passphrase: get("DKIM_passphrase"),
                identity: get("DKIM_identity"),
            },
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn complete_vars() -> HashMap<String, String> {
        [
            ("DB_HOST", "localhost"),
            ("DB_NAME", "owp"),
            ("DB_USER", "owp"),
            ("DB_PASS", "secret"),
            ("THEME", "bootstrap"),
            ("ISDEV", "0"),
            ("smtp_hostname", "mail.example.org"),
            ("smtp_auth", "1"),
            ("smtp_username", "mailer"),
            ("smtp_password", "hunter2"),
            ("smtp_port", "587"),
            ("smtp_secure", "tls"),
            ("DKIM_domain", "example.org"),
            ("DKIM_private", "example_org"),
            ("DKIM_selector", "mail"),
            ("DKIM_passphrase", "pass"),
            ("DKIM_identity", "noreply@example.org"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_complete_environment() {
        let settings = EnvSettings::from_map(&complete_vars()).unwrap();
        assert_eq!(settings.theme, "bootstrap");
        assert_eq!(settings.smtp.port, 587);
        assert_eq!(settings.smtp.security, SmtpSecurity::Tls);
        assert!(settings.smtp.auth);
        assert!(!settings.is_dev);
        assert_eq!(settings.dkim.identity, "noreply@example.org");
    }

    #[test]
    fn test_missing_and_empty_keys_reported_together() {
        let mut vars = complete_vars();
        vars.remove("DB_PASS");
        vars.insert("THEME".to_string(), "  ".to_string());
        vars.remove("DKIM_selector");

        match EnvSettings::from_map(&vars) {
            Err(ConfigError::MissingKeys(keys)) => {
                assert_eq!(keys, vec!["DB_PASS", "THEME", "DKIM_selector"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_smtp_secure_allowed_values() {
        for (value, expected) in [
            ("ssl", SmtpSecurity::Ssl),
            ("tls", SmtpSecurity::Tls),
            ("none", SmtpSecurity::None),
        ] {
            let mut vars = complete_vars();
            vars.insert("smtp_secure".to_string(), value.to_string());
            let settings = EnvSettings::from_map(&vars).unwrap();
            assert_eq!(settings.smtp.security, expected);
        }
    }

    #[test]
    fn test_smtp_secure_rejects_other_values() {
        let mut vars = complete_vars();
        vars.insert("smtp_secure".to_string(), "starttls".to_string());
        let err = EnvSettings::from_map(&vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "smtp_secure", .. }
        ));

        vars.remove("smtp_secure");
        assert!(EnvSettings::from_map(&vars).is_err());
    }

    #[test]
    fn test_invalid_port_and_flag() {
        let mut vars = complete_vars();
        vars.insert("smtp_port".to_string(), "smtp".to_string());
        assert!(matches!(
            EnvSettings::from_map(&vars),
            Err(ConfigError::InvalidValue { key: "smtp_port", .. })
        ));

        let mut vars = complete_vars();
        vars.insert("smtp_auth".to_string(), "maybe".to_string());
        assert!(matches!(
            EnvSettings::from_map(&vars),
            Err(ConfigError::InvalidValue { key: "smtp_auth", .. })
        ));
    }

    #[test]
    fn test_isdev_is_optional() {
        let mut vars = complete_vars();
        vars.remove("ISDEV");
        assert!(!EnvSettings::from_map(&vars).unwrap().is_dev);

        vars.insert("ISDEV".to_string(), "1".to_string());
        assert!(EnvSettings::from_map(&vars).unwrap().is_dev);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = EnvSettings::from_map(&complete_vars()).unwrap();
        let dump = format!("{settings:?}");
        assert!(!dump.contains("secret"));
        assert!(!dump.contains("hunter2"));
    }

    #[test]
    fn test_missing_dotenv_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dotenv(dir.path()).is_ok());
    }

    #[test]
    fn test_dotenv_does_not_override_process() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "OWPTEST_DOTENV_ONLY=from-file\nOWPTEST_DOTENV_SHARED=from-file\n",
        )
        .unwrap();
        std::env::set_var("OWPTEST_DOTENV_SHARED", "from-process");

        load_dotenv(dir.path()).unwrap();

        assert_eq!(std::env::var("OWPTEST_DOTENV_ONLY").unwrap(), "from-file");
        assert_eq!(std::env::var("OWPTEST_DOTENV_SHARED").unwrap(), "from-process");
    }

    #[test]
    fn test_settings_from_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents: Vec<String> = complete_vars()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        contents.sort();
        std::fs::write(dir.path().join(".env"), contents.join("\n")).unwrap();

        load_dotenv(dir.path()).unwrap();
        let settings = EnvSettings::from_process_env().unwrap();

        assert_eq!(settings.dkim.domain, "example.org");
        assert_eq!(settings.dkim.private_key, "example_org");
        assert_eq!(settings.smtp.hostname, "mail.example.org");
        assert_eq!(settings.smtp.security, SmtpSecurity::Tls);
    }

    #[test]
    fn test_unreadable_dotenv_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "NOT A VALID LINE\n").unwrap();
        assert!(matches!(load_dotenv(dir.path()), Err(ConfigError::Load(_))));
    }
}
