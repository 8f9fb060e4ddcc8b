//! Theme asset serving
//!
//! `<assets_prefix>/<file>` is looked up as `assets/<file>` in the active
//! theme, then in the default theme.

use std::path::{Path, PathBuf};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use tokio::fs;

use crate::http::{self, cache, mime};
use crate::logger;
use crate::theme::{ResolvedPath, ResourceRoots};

const ASSETS_DIR: &str = "assets";

/// Relative asset path below `prefix`, or `None` if the path is outside it
pub fn asset_path(path: &str, prefix: &str) -> Option<PathBuf> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?.strip_prefix('/')?;
    if rest.is_empty() || rest.ends_with('/') {
        return None;
    }
    Some(Path::new(ASSETS_DIR).join(rest))
}

/// Locate and read an asset; traversal attempts resolve to nothing
pub async fn load_asset(roots: &ResourceRoots, relative: &Path) -> Option<(ResolvedPath, Vec<u8>)> {
    let resolved = roots.find(relative)?;
    match fs::read(&resolved.path).await {
        Ok(content) => Some((resolved, content)),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read asset '{}': {e}",
                resolved.path.display()
            ));
            None
        }
    }
}

pub async fn serve_asset(
    roots: &ResourceRoots,
    relative: &Path,
    if_none_match: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let Some((resolved, content)) = load_asset(roots, relative).await else {
        return http::build_404_response();
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    let content_type = mime::content_type_for(&resolved.path);
    http::build_asset_response(Bytes::from(content), content_type, &etag, is_head)
}
