//! Request routing module
//!
//! Entry point for HTTP request processing: method and size checks, theme
//! assets, then the front controller dispatcher.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_TYPE, COOKIE, SERVER};
use hyper::{Method, Request, Response};

use crate::config::AppState;
use crate::dispatch::{self, DispatchOutcome, RequestInfo, UserSession};
use crate::handler::assets;
use crate::http;
use crate::logger::{self, AccessLogEntry};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let started = Instant::now();
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.referer = header_string(&req, "referer");
    entry.user_agent = header_string(&req, "user-agent");

    let mut response = route(req, &state, &mut entry).await;

    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, name);
    }

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn route<B>(
    req: Request<B>,
    state: &AppState,
    entry: &mut AccessLogEntry,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(req.method(), state.config.http.enable_cors) {
        return resp;
    }

    // 2. Check declared body size
    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(&req, max_body_size) {
        return resp;
    }

    let is_head = req.method() == Method::HEAD;

    // 3. Theme assets
    if req.method() != Method::POST {
        if let Some(relative) = assets::asset_path(req.uri().path(), &state.config.app.assets_prefix)
        {
            let if_none_match = header_string(&req, "if-none-match");
            return assets::serve_asset(&state.roots, &relative, if_none_match.as_deref(), is_head)
                .await;
        }
    }

    // 4. Front controller
    let session = UserSession::load(
        req.headers().get(COOKIE).and_then(|v| v.to_str().ok()),
        &state.config.app.session_cookie,
        state.sessions.as_ref(),
    )
    .await;
    let request = match read_request(req, max_body_size).await {
        Ok(request) => request,
        Err(resp) => return resp,
    };
    let action = dispatch::resolve_action(&request, &state.config.app.default_action);
    logger::log_debug(&format!(
        "{} {} -> action '{action}'",
        request.method, request.path
    ));
    entry.action = Some(action);

    match dispatch::dispatch(state, request, session).await {
        Ok(DispatchOutcome::Page { html, trace }) => {
            logger::log_debug(&format!(
                "action '{}' rendered {} fragment(s), mod: {}",
                entry.action.as_deref().unwrap_or("-"),
                trace.templates.len(),
                trace
                    .mods
                    .first()
                    .map_or("none", |(origin, _)| *origin)
            ));
            http::build_page_response(html, is_head)
        }
        Ok(DispatchOutcome::Ajax(resp)) => http::build_ajax_response(resp, is_head),
        Err(e) => {
            logger::log_error(&format!(
                "Request for action '{}' failed: {e}",
                entry.action.as_deref().unwrap_or("-")
            ));
            http::build_500_response()
        }
    }
}

/// Check HTTP method and answer anything the front controller does not serve
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match method {
        &Method::GET | &Method::HEAD | &Method::POST => None,
        &Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Decode query, body and form fields; bodies without a length are capped too
async fn read_request<B>(
    req: Request<B>,
    max_body_size: u64,
) -> Result<RequestInfo, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);

    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => {
            logger::log_error(&format!("Request body exceeded {max_body_size} bytes"));
            return Err(http::build_413_response());
        }
        Err(e) => {
            logger::log_connection_error(&e);
            return Err(http::build_500_response());
        }
    };

    let is_form = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));
    let form = if is_form {
        RequestInfo::decode_pairs(&String::from_utf8_lossy(&body))
    } else {
        Default::default()
    };

    Ok(RequestInfo {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: RequestInfo::decode_pairs(parts.uri.query().unwrap_or_default()),
        form,
    })
}

fn header_string<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::env::tests::complete_vars;
    use crate::config::{Config, EnvSettings};
    use crate::dispatch::ModRegistry;
    use crate::mail::tests::{RecordingTransport, StaticResolver};
    use crate::mail::Messaging;
    use crate::mods;
    use std::path::Path;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn app(root: &Path) -> Arc<AppState> {
        write(root, "config.toml", "[logging]\naccess_log = false\n\n[http]\nmax_body_size = 64\n");
        let env = Arc::new(EnvSettings::from_map(&complete_vars()).unwrap());
        let config = Config::load_from(root.join("config").to_str().unwrap(), root).unwrap();
        let messaging = Messaging::new(
            Arc::clone(&env),
            root.join("dkim"),
            Arc::new(RecordingTransport::default()),
            Arc::new(StaticResolver::default()),
        );
        let mut registry = ModRegistry::new();
        mods::register(&mut registry, &config, &env);
        Arc::new(AppState::new(config, env, registry, messaging))
    }

    fn peer() -> SocketAddr {
        "192.0.2.10:50000".parse().unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> Response<Full<Bytes>> {
        handle_request(req, Arc::clone(state), peer()).await.unwrap()
    }

    async fn text(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Full<Bytes>> {
        Request::builder().uri(uri).body(Full::new(Bytes::new())).unwrap()
    }

    #[tokio::test]
    async fn test_renders_default_action() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/themes/default/pages/home.hbs", "home {{mod_data.web_root}}");
        let state = app(dir.path());

        let resp = send(&state, get("/")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[SERVER], "OpenWebPresence/1.0");
        assert_eq!(text(resp).await, "home /");
    }

    #[tokio::test]
    async fn test_route_parameter_selects_page() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/themes/bootstrap/pages/about.hbs", "about us");
        let state = app(dir.path());

        let resp = send(&state, get("/index?_route_=about")).await;
        assert_eq!(text(resp).await, "about us");
    }

    #[tokio::test]
    async fn test_ajax_route() {
        let dir = tempfile::tempdir().unwrap();
        let state = app(dir.path());

        let resp = send(&state, get("/?_route_=ajax&op=status")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        assert!(text(resp).await.contains("\"ok\":true"));
    }

    #[tokio::test]
    async fn test_session_cookie_resolves_user() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sessions/s3ss10n", "7");
        let state = app(dir.path());

        let req = Request::builder()
            .uri("/?_route_=ajax")
            .header(COOKIE, "owp_session=s3ss10n")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&text(send(&state, req).await).await).unwrap();
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user_id"], 7);

        let anonymous: serde_json::Value =
            serde_json::from_str(&text(send(&state, get("/?_route_=ajax")).await).await).unwrap();
        assert_eq!(anonymous["authenticated"], false);
    }

    #[tokio::test]
    async fn test_method_checks() {
        let dir = tempfile::tempdir().unwrap();
        let state = app(dir.path());

        let delete = Request::builder()
            .method(Method::DELETE)
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(send(&state, delete).await.status(), 405);

        let options = Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(send(&state, options).await.status(), 204);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = app(dir.path());

        let declared = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header("content-length", "1000")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(send(&state, declared).await.status(), 413);

        let undeclared = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Full::new(Bytes::from(vec![b'a'; 100])))
            .unwrap();
        assert_eq!(send(&state, undeclared).await.status(), 413);
    }

    #[tokio::test]
    async fn test_form_post_reaches_mod() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "app/themes/default/pages/contact.hbs",
            "{{#if mod_data.sent}}sent{{else}}missing {{mod_data.missing}}{{/if}}",
        );
        let state = app(dir.path());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/?_route_=contact")
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(Full::new(Bytes::from("name=Jane")))
            .unwrap();
        let html = text(send(&state, req).await).await;
        assert!(html.starts_with("missing"), "{html}");
        assert!(html.contains("message_body"));
    }

    #[tokio::test]
    async fn test_assets_served_from_theme() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/themes/default/assets/site.css", "body{}");
        let state = app(dir.path());

        let resp = send(&state, get("/assets/site.css")).await;
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().contains_key("etag"));

        assert_eq!(send(&state, get("/assets/nope.css")).await.status(), 404);
    }

    #[tokio::test]
    async fn test_broken_template_is_500() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/themes/default/pages/home.hbs", "{{#if title}}unclosed");
        let state = app(dir.path());

        assert_eq!(send(&state, get("/")).await.status(), 500);
    }
}
