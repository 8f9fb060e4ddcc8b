//! Default AJAX handler

use async_trait::async_trait;
use serde_json::json;

use crate::dispatch::{AjaxHandler, AjaxResponse, FrameworkContext};
use crate::error::FrameworkError;

/// Answers `?_route_=ajax&op=<name>` requests with JSON
pub struct StatusAjax;

#[async_trait]
impl AjaxHandler for StatusAjax {
    async fn process_action(&self, ctx: &FrameworkContext) -> Result<AjaxResponse, FrameworkError> {
        let op = ctx
            .request
            .query
            .get("op")
            .or_else(|| ctx.request.form.get("op"))
            .map_or("status", String::as_str);

        match op {
            "status" => AjaxResponse::json(
                200,
                &json!({
                    "ok": true,
                    "authenticated": ctx.session.is_authenticated(),
                    "user_id": ctx.session.user_id,
                }),
            ),
            other => AjaxResponse::json(
                400,
                &json!({ "ok": false, "error": format!("unknown operation '{other}'") }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RequestInfo;
    use crate::mods::tests::context;
    use serde_json::Value;

    #[tokio::test]
    async fn test_status_default_op() {
        let ctx = context("ajax", RequestInfo::default(), Default::default());
        let resp = StatusAjax.process_action(&ctx).await.unwrap();
        assert_eq!(resp.status, 200);
        let body: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["user_id"], 0);
    }

    #[tokio::test]
    async fn test_unknown_op() {
        let mut request = RequestInfo::default();
        request.query.insert("op".to_string(), "reboot".to_string());
        let ctx = context("ajax", request, Default::default());
        let resp = StatusAjax.process_action(&ctx).await.unwrap();
        assert_eq!(resp.status, 400);
        assert!(resp.body.contains("unknown operation 'reboot'"));
    }
}
