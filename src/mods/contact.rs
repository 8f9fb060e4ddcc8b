//! Contact form mod

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::MailDelivery;
use crate::dispatch::{FrameworkContext, ModHandler};
use crate::error::FrameworkError;
use crate::logger;
use crate::mail::MailRequest;

/// Sends the posted contact form to the site inbox
#[derive(Debug, Clone)]
pub struct ContactMod {
    site_domain: String,
    inbox: String,
    delivery: MailDelivery,
}

impl ContactMod {
    pub fn new(site_domain: &str, inbox: &str, delivery: MailDelivery) -> Self {
        Self {
            site_domain: site_domain.to_string(),
            inbox: inbox.to_string(),
            delivery,
        }
    }

    /// Mail request for a submitted form; absent form fields stay absent
    fn mail_request(&self, ctx: &FrameworkContext) -> MailRequest {
        let form = &ctx.request.form;
        let mut request = MailRequest::new()
            .with("sender_domain", &self.site_domain)
            .with("email_to", &self.inbox)
            .with("email_to_name", &self.site_domain)
            .with("email_from", &format!("noreply@{}", self.site_domain))
            .with("email_from_name", &self.site_domain);

        if let Some(name) = form.get("name") {
            request = request.with("subject", &format!("Contact form: {name}"));
        }
        if let Some(email) = form.get("email") {
            request = request.with("reply_to", email);
        }
        if let Some(message) = form.get("message") {
            request = request.with("message_body", &message_html(message));
        }
        request
    }
}

#[async_trait]
impl ModHandler for ContactMod {
    async fn process(&self, ctx: &FrameworkContext) -> Result<Value, FrameworkError> {
        if ctx.request.method != "POST" {
            return Ok(json!({ "submitted": false }));
        }

        let request = self.mail_request(ctx);
        ctx.debug.log(&request.missing_fields(), "contact missing");

        let result = match self.delivery {
            MailDelivery::Relay => ctx.messaging.send_via_smtp(&request).await,
            MailDelivery::Direct => ctx.messaging.send_direct(&request).await,
        };
        match result {
            Ok(()) => Ok(json!({ "submitted": true, "sent": true })),
            Err(FrameworkError::Validation { missing }) => Ok(json!({
                "submitted": true,
                "sent": false,
                "missing": missing,
            })),
            Err(e @ (FrameworkError::Transport(_) | FrameworkError::Resolve(_))) => {
                logger::log_error(&format!("Contact form delivery failed: {e}"));
                Ok(json!({
                    "submitted": true,
                    "sent": false,
                    "error": "delivery failed",
                }))
            }
            Err(e) => Err(e),
        }
    }
}

/// Escaped message text with line breaks kept as `<br>`
fn message_html(text: &str) -> String {
    handlebars::html_escape(text)
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RequestInfo;
    use crate::mail::tests::RecordingTransport;
    use crate::mods::tests::context;
    use std::sync::Arc;

    fn post(form: &[(&str, &str)]) -> RequestInfo {
        RequestInfo {
            method: "POST".to_string(),
            path: "/".to_string(),
            form: form
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_renders_empty_form() {
        let transport = Arc::new(RecordingTransport::default());
        let ctx = context("contact", RequestInfo::default(), transport.clone());
        let data = ContactMod::new("example.org", "owner@example.org", MailDelivery::Relay)
            .process(&ctx)
            .await
            .unwrap();
        assert_eq!(data["submitted"], false);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_sends_through_relay() {
        let transport = Arc::new(RecordingTransport::default());
        let request = post(&[
            ("name", "Jane"),
            ("email", "jane@example.net"),
            ("message", "Hi <there>"),
        ]);
        let ctx = context("contact", request, transport.clone());
        let data = ContactMod::new("example.org", "owner@example.org", MailDelivery::Relay)
            .process(&ctx)
            .await
            .unwrap();
        assert_eq!(data["sent"], true);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].host, "mail.example.org");
        assert_eq!(sent[0].subject, "Contact form: Jane");
        assert_eq!(sent[0].body, "Hi &lt;there&gt;");
        assert_eq!(sent[0].to.email, "owner@example.org");
    }

    #[tokio::test]
    async fn test_incomplete_form_reports_missing() {
        let transport = Arc::new(RecordingTransport::default());
        let ctx = context("contact", post(&[("name", "Jane")]), transport.clone());
        let data = ContactMod::new("example.org", "owner@example.org", MailDelivery::Relay)
            .process(&ctx)
            .await
            .unwrap();
        assert_eq!(data["sent"], false);
        assert_eq!(data["missing"], json!(["message_body", "reply_to"]));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_reported() {
        let transport = Arc::new(RecordingTransport {
            failure: Some("550 rejected".to_string()),
            ..Default::default()
        });
        let request = post(&[("name", "J"), ("email", "j@x.net"), ("message", "m")]);
        let ctx = context("contact", request, transport);
        let data = ContactMod::new("example.org", "owner@example.org", MailDelivery::Relay)
            .process(&ctx)
            .await
            .unwrap();
        assert_eq!(data["sent"], false);
        assert_eq!(data["error"], "delivery failed");
    }

    #[tokio::test]
    async fn test_direct_delivery_uses_mx_host() {
        let transport = Arc::new(RecordingTransport::default());
        let request = post(&[("name", "J"), ("email", "j@x.net"), ("message", "m")]);
        let ctx = context("contact", request, transport.clone());
        let data = ContactMod::new("example.org", "owner@example.com", MailDelivery::Direct)
            .process(&ctx)
            .await
            .unwrap();
        assert_eq!(data["sent"], true);
        assert_eq!(transport.sent.lock().unwrap()[0].host, "203.0.113.25");
    }

    #[tokio::test]
    async fn test_direct_delivery_resolve_failure_reported() {
        let transport = Arc::new(RecordingTransport::default());
        let request = post(&[("name", "J"), ("email", "j@x.net"), ("message", "m")]);
        let ctx = context("contact", request, transport.clone());
        let data = ContactMod::new("example.org", "owner@unknown.test", MailDelivery::Direct)
            .process(&ctx)
            .await
            .unwrap();
        assert_eq!(data["error"], "delivery failed");
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_message_html() {
        assert_eq!(message_html("a&b\n\"c\""), "a&amp;b<br>&quot;c&quot;");
        assert_eq!(message_html("one\r\ntwo"), "one<br>two");
    }
}
