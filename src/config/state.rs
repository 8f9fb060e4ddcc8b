// Application state module
// Everything a request needs, built once at startup and shared read-only

use std::sync::Arc;

use super::env::EnvSettings;
use super::types::Config;
use crate::db::DatabaseHandle;
use crate::dispatch::{FileSessionStore, ModRegistry, SessionStore};
use crate::mail::Messaging;
use crate::theme::{ResourceRoots, TemplateRenderer};

/// Application state
pub struct AppState {
    pub config: Config,
    pub env: Arc<EnvSettings>,
    pub roots: ResourceRoots,
    pub renderer: TemplateRenderer,
    pub registry: ModRegistry,
    pub messaging: Arc<Messaging>,
    pub db: Arc<DatabaseHandle>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        env: Arc<EnvSettings>,
        registry: ModRegistry,
        messaging: Messaging,
    ) -> Self {
        let roots = ResourceRoots::for_theme(&config.app.root_path, &env.theme);
        let renderer = TemplateRenderer::new(&config.app.template_ext);
        let db = Arc::new(DatabaseHandle::new(&env.database));
        let sessions = Arc::new(FileSessionStore::new(
            config.app.root_path.join(&config.app.session_dir),
        ));

        Self {
            config,
            env,
            roots,
            renderer,
            registry,
            messaging: Arc::new(messaging),
            db,
            sessions,
        }
    }
}
