//! SQL client descriptor
//!
//! The framework only carries the connection parameters; mods open their own
//! connections with whatever driver the application uses.

use crate::config::DatabaseSettings;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Serialize)]
pub struct DatabaseHandle {
    pub user: String,
    #[serde(skip)]
    password: String,
    pub database: String,
    pub host: String,
}

impl DatabaseHandle {
    pub fn new(settings: &DatabaseSettings) -> Self {
        Self {
            user: settings.user.clone(),
            password: settings.password.clone(),
            database: settings.name.clone(),
            host: settings.host.clone(),
        }
    }

    /// MySQL connection URL
    pub fn dsn(&self) -> String {
        format!(
            "mysql://{}:{}@{}/{}",
            self.user, self.password, self.host, self.database
        )
    }
}

/// Connection URL with the password masked
impl fmt::Display for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credentials = format!("{}:{}@", self.user, self.password);
        let masked = format!("{}:****@", self.user);
        f.write_str(&self.dsn().replacen(&credentials, &masked, 1))
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("user", &self.user)
            .field("database", &self.database)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}
