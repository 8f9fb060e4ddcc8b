//! Built-in application mods
//!
//! Sites register their own mods next to these; a theme can replace any of
//! them through `ModRegistry::register_for_theme`.

mod contact;
mod status;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{Config, EnvSettings};
use crate::dispatch::{FrameworkContext, ModHandler, ModRegistry};
use crate::error::FrameworkError;
use crate::logger;

pub use contact::ContactMod;
pub use status::StatusAjax;

/// Landing page data
pub struct HomeMod;

#[async_trait]
impl ModHandler for HomeMod {
    async fn process(&self, ctx: &FrameworkContext) -> Result<Value, FrameworkError> {
        Ok(json!({
            "web_root": ctx.web_root,
            "signed_in": ctx.session.is_authenticated(),
        }))
    }
}

type Factory = Box<dyn Fn() -> Box<dyn ModHandler> + Send + Sync>;

const BUILTIN_MODS: [&str; 2] = ["home", "contact"];

/// Factory for the built-in mod called `name`
fn builtin(name: &str, contact: &ContactMod) -> Option<Factory> {
    match name {
        "home" => Some(Box::new(|| -> Box<dyn ModHandler> { Box::new(HomeMod) })),
        "contact" => {
            let contact = contact.clone();
            Some(Box::new(move || -> Box<dyn ModHandler> {
                Box::new(contact.clone())
            }))
        }
        _ => None,
    }
}

/// Register the built-in mods, the theme bindings from `app.theme_mods` and
/// the AJAX handler
pub fn register(registry: &mut ModRegistry, config: &Config, env: &EnvSettings) {
    let contact = ContactMod::new(
        &env.dkim.domain,
        &env.dkim.identity,
        config.app.mail_delivery,
    );

    for name in BUILTIN_MODS {
        if let Some(factory) = builtin(name, &contact) {
            registry.register(name, factory);
        }
    }

    for (theme, actions) in &config.app.theme_mods {
        for (action, name) in actions {
            match builtin(name, &contact) {
                Some(factory) => {
                    registry.register_for_theme(theme, action, factory);
                }
                None => logger::log_warning(&format!(
                    "Theme '{theme}' binds action '{action}' to unknown mod '{name}'"
                )),
            }
        }
    }

    registry.set_ajax_handler(Arc::new(StatusAjax));
}
