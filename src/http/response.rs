//! HTTP response builders

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::response::Builder;
use hyper::Response;

use super::cache::CachePolicy;
use crate::dispatch::AjaxResponse;

pub const ALLOWED_METHODS: &str = "GET, HEAD, POST, OPTIONS";

/// Assembled page from the dispatcher
pub fn build_page_response(html: String, is_head: bool) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", html.len())
        .header("Cache-Control", CachePolicy::NoStore.header_value());
    finish(builder, head_or(Bytes::from(html), is_head), "page")
}

pub fn build_ajax_response(resp: AjaxResponse, is_head: bool) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(resp.status)
        .header("Content-Type", resp.content_type)
        .header("Content-Length", resp.body.len())
        .header("Cache-Control", CachePolicy::NoStore.header_value());
    finish(builder, head_or(Bytes::from(resp.body), is_head), "AJAX")
}

/// Theme asset with validator
pub fn build_asset_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", data.len())
        .header("ETag", etag)
        .header("Cache-Control", CachePolicy::ASSETS.header_value());
    finish(builder, head_or(data, is_head), "asset")
}

pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(304)
        .header("ETag", etag)
        .header("Cache-Control", CachePolicy::ASSETS.header_value());
    finish(builder, Bytes::new(), "304")
}

pub fn build_404_response() -> Response<Full<Bytes>> {
    plain(404, "404 Not Found")
}

pub fn build_405_response() -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", ALLOWED_METHODS);
    finish(builder, Bytes::from("405 Method Not Allowed"), "405")
}

pub fn build_413_response() -> Response<Full<Bytes>> {
    plain(413, "413 Payload Too Large")
}

/// Details stay in the error log
pub fn build_500_response() -> Response<Full<Bytes>> {
    plain(500, "500 Internal Server Error")
}

/// Preflight answer
pub fn build_options_response(enable_cors: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(204).header("Allow", ALLOWED_METHODS);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
            .header("Access-Control-Allow-Headers", "Content-Type, X-Requested-With")
            .header("Access-Control-Max-Age", "86400");
    }
    finish(builder, Bytes::new(), "OPTIONS")
}

fn plain(status: u16, text: &'static str) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(status)
        .header("Content-Type", "text/plain");
    finish(builder, Bytes::from_static(text.as_bytes()), text)
}

fn head_or(body: Bytes, is_head: bool) -> Bytes {
    if is_head {
        Bytes::new()
    } else {
        body
    }
}

fn finish(builder: Builder, body: Bytes, label: &str) -> Response<Full<Bytes>> {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        crate::logger::log_error(&format!("Failed to build {label} response: {e}"));
        let mut fallback = Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_page_response() {
        let resp = build_page_response("<h1>hi</h1>".to_string(), false);
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-length"], "11");
        assert_eq!(resp.headers()["cache-control"], "no-store");
        assert_eq!(body_of(resp).await, "<h1>hi</h1>");
    }

    #[tokio::test]
    async fn test_head_keeps_length_drops_body() {
        let resp = build_page_response("<h1>hi</h1>".to_string(), true);
        assert_eq!(resp.headers()["content-length"], "11");
        assert!(body_of(resp).await.is_empty());
    }

    #[test]
    fn test_ajax_status_and_type() {
        let resp = build_ajax_response(
            AjaxResponse {
                status: 400,
                content_type: "application/json".to_string(),
                body: "{}".to_string(),
            },
            false,
        );
        assert_eq!(resp.status(), 400);
        assert_eq!(resp.headers()["content-type"], "application/json");
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(build_404_response().status(), 404);
        assert_eq!(build_413_response().status(), 413);
        assert_eq!(build_500_response().status(), 500);

        let resp = build_405_response();
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()["allow"], ALLOWED_METHODS);
    }

    #[test]
    fn test_options_cors() {
        let plain = build_options_response(false);
        assert_eq!(plain.status(), 204);
        assert!(plain.headers().get("access-control-allow-origin").is_none());

        let cors = build_options_response(true);
        assert_eq!(cors.headers()["access-control-allow-origin"], "*");
    }
}
