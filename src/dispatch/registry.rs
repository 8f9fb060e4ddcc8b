//! Action registry
//!
//! Maps action names to mod factories. A theme may register its own mod for
//! an action; that registration is preferred over the application default.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::context::FrameworkContext;
use crate::error::FrameworkError;

/// Application request handler selected by action name
#[async_trait]
pub trait ModHandler: Send + Sync {
    /// Produce the data exposed to templates as `mod_data`
    async fn process(&self, ctx: &FrameworkContext) -> Result<Value, FrameworkError>;
}

/// Handler for the `ajax` action
#[async_trait]
pub trait AjaxHandler: Send + Sync {
    async fn process_action(&self, ctx: &FrameworkContext) -> Result<AjaxResponse, FrameworkError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AjaxResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl AjaxResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Result<Self, FrameworkError> {
        let body = serde_json::to_string(value).map_err(|e| FrameworkError::Mod {
            action: "ajax".to_string(),
            message: format!("failed to encode response: {e}"),
        })?;
        Ok(Self {
            status,
            content_type: "application/json".to_string(),
            body,
        })
    }
}

pub type ModFactory = Arc<dyn Fn() -> Box<dyn ModHandler> + Send + Sync>;

#[derive(Default)]
pub struct ModRegistry {
    defaults: HashMap<String, ModFactory>,
    themed: HashMap<(String, String), ModFactory>,
    ajax: Option<Arc<dyn AjaxHandler>>,
}

impl ModRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the application default mod for `action`
    pub fn register<F>(&mut self, action: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn ModHandler> + Send + Sync + 'static,
    {
        self.defaults.insert(action.to_string(), Arc::new(factory));
        self
    }

    /// Register a mod that overrides the default for `action` under `theme`
    pub fn register_for_theme<F>(&mut self, theme: &str, action: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn ModHandler> + Send + Sync + 'static,
    {
        self.themed
            .insert((theme.to_string(), action.to_string()), Arc::new(factory));
        self
    }

    pub fn set_ajax_handler(&mut self, handler: Arc<dyn AjaxHandler>) -> &mut Self {
        self.ajax = Some(handler);
        self
    }

    /// Theme registration first, then the default; the label tells which won
    pub fn resolve(&self, theme: &str, action: &str) -> Option<(&'static str, ModFactory)> {
        self.themed
            .get(&(theme.to_string(), action.to_string()))
            .map(|f| ("theme", Arc::clone(f)))
            .or_else(|| {
                self.defaults
                    .get(action)
                    .map(|f| ("default", Arc::clone(f)))
            })
    }

    pub fn ajax_handler(&self) -> Option<Arc<dyn AjaxHandler>> {
        self.ajax.clone()
    }

    /// Registered action names, sorted
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self
            .defaults
            .keys()
            .chain(self.themed.keys().map(|(_, action)| action))
            .cloned()
            .collect();
        actions.sort();
        actions.dedup();
        actions
    }
}
