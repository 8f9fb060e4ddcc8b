//! Request-scoped values shared with mods and the AJAX handler

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::db::DatabaseHandle;
use crate::logger::DebugLog;
use crate::mail::Messaging;

/// Decoded inbound request
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// `application/x-www-form-urlencoded` body fields
    pub form: HashMap<String, String>,
}

impl RequestInfo {
    /// Decode a query string or form body; later duplicates win
    pub fn decode_pairs(raw: &str) -> HashMap<String, String> {
        serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default()
    }
}

/// Session accessor backed by the session cookie
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserSession {
    pub session_id: Option<String>,
    /// 0 for anonymous visitors
    pub user_id: u64,
}

impl UserSession {
    /// Session id from a `Cookie` header, without looking up the user
    pub fn from_cookie_header(header: Option<&str>, cookie_name: &str) -> Self {
        let session_id = header.and_then(|raw| {
            raw.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == cookie_name && !value.is_empty()).then(|| value.to_string())
            })
        });
        Self {
            session_id,
            user_id: 0,
        }
    }

    /// Session from the cookie with the user resolved through `store`
    pub async fn load(header: Option<&str>, cookie_name: &str, store: &dyn SessionStore) -> Self {
        let mut session = Self::from_cookie_header(header, cookie_name);
        if let Some(id) = &session.session_id {
            session.user_id = store.user_id(id).await.unwrap_or(0);
        }
        session
    }

    pub const fn is_authenticated(&self) -> bool {
        self.user_id != 0
    }
}

/// Maps a session id to the signed-in user
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn user_id(&self, session_id: &str) -> Option<u64>;
}

/// Sessions written by the application's sign-in flow, one file per session
/// id holding the user id
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn user_id(&self, session_id: &str) -> Option<u64> {
        // ids become file names
        if !session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return None;
        }
        let contents = tokio::fs::read_to_string(self.dir.join(session_id)).await.ok()?;
        contents.trim().parse().ok().filter(|id| *id != 0)
    }
}

/// Shared bundle handed to mods and the AJAX handler
pub struct FrameworkContext {
    pub action: String,
    pub db: Arc<DatabaseHandle>,
    pub debug: DebugLog,
    pub session: UserSession,
    /// Value returned by the mod for this request, `null` when none ran
    pub mod_data: Value,
    pub web_root: String,
    pub root_path: PathBuf,
    pub request: RequestInfo,
    pub messaging: Arc<Messaging>,
}
