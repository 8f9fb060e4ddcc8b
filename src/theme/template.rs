//! Template fragment rendering
//!
//! Fragments are handlebars files. They are read from disk on every render;
//! nothing is cached between requests.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tokio::fs;

use super::{ResolvedPath, ResourceRoots};
use crate::error::FrameworkError;

/// Sub-directory holding page bodies
pub const PAGES_DIR: &str = "pages";
/// Sub-directory holding header, nav and footer
pub const COMMON_DIR: &str = "common";

pub struct TemplateRenderer {
    engine: Handlebars<'static>,
    extension: String,
}

impl TemplateRenderer {
    pub fn new(extension: &str) -> Self {
        let mut engine = Handlebars::new();
        engine.set_strict_mode(false);
        Self {
            engine,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Relative path of a fragment: `<sub_dir>/<name>.<ext>`
    pub fn fragment_path(&self, sub_dir: &str, name: &str) -> PathBuf {
        Path::new(sub_dir).join(format!("{name}.{}", self.extension))
    }

    /// Resolve a fragment theme-first without rendering it
    pub fn resolve(&self, roots: &ResourceRoots, sub_dir: &str, name: &str) -> Option<ResolvedPath> {
        roots.find(&self.fragment_path(sub_dir, name))
    }

    /// Render a resolved fragment against `data`
    pub async fn render<T: Serialize + Sync>(
        &self,
        resolved: &ResolvedPath,
        data: &T,
    ) -> Result<String, FrameworkError> {
        let source = fs::read_to_string(&resolved.path).await?;
        self.engine
            .render_template(&source, data)
            .map_err(|e| FrameworkError::Template {
                path: resolved.path.display().to_string(),
                message: e.to_string(),
            })
    }
}
