//! Theme resource resolution
//!
//! A theme overrides individual files of the `default` theme. Every lookup
//! (page templates, common fragments, assets) goes through [`ResourceRoots`],
//! which searches an ordered list of roots and returns the first existing file.

pub mod template;

use std::path::{Path, PathBuf};

pub use template::TemplateRenderer;

/// Name of the fallback theme
pub const DEFAULT_THEME: &str = "default";

/// A file found under one of the resource roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Label of the root the file came from ("theme" or "default")
    pub origin: &'static str,
    pub path: PathBuf,
}

/// Ordered list of directories searched in priority order
#[derive(Debug, Clone)]
pub struct ResourceRoots {
    roots: Vec<(&'static str, PathBuf)>,
}

impl ResourceRoots {
    /// Roots for a theme: `<root>/app/themes/<theme>` then `<root>/app/themes/default`
    ///
    /// When the active theme is the default theme it is only searched once.
    pub fn for_theme(root_path: &Path, theme: &str) -> Self {
        let themes = root_path.join("app").join("themes");
        let mut roots = vec![("theme", themes.join(theme))];
        if theme != DEFAULT_THEME {
            roots.push(("default", themes.join(DEFAULT_THEME)));
        }
        Self { roots }
    }

    /// Find the first existing file `<root>/<relative>`
    ///
    /// Absolute paths and `..` components are refused so a lookup can never
    /// leave its root.
    pub fn find(&self, relative: &Path) -> Option<ResolvedPath> {
        if !is_contained(relative) {
            return None;
        }
        self.roots.iter().find_map(|(origin, root)| {
            let candidate = root.join(relative);
            candidate.is_file().then(|| ResolvedPath {
                origin: *origin,
                path: candidate,
            })
        })
    }

    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(|(_, p)| p.as_path())
    }
}

fn is_contained(relative: &Path) -> bool {
    use std::path::Component;
    !relative.as_os_str().is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
