//! Messaging helper
//!
//! Sends templated HTML mail either straight to the recipient's mail exchanger
//! ([`Messaging::send_direct`]) or through the configured relay
//! ([`Messaging::send_via_smtp`]). Both validate the request before any
//! network I/O happens.

pub mod mx;
pub mod transport;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::{EnvSettings, SmtpSecurity};
use crate::error::FrameworkError;
use crate::logger;

pub use mx::{DnsResolver, MxResolver};
pub use transport::{
    DkimParams, LettreTransport, MailAddress, MailTransport, OutboundMail, SmtpCredentials,
};

/// Fields every mail request must carry, in reporting order
pub const REQUIRED_FIELDS: [&str; 8] = [
    "sender_domain",
    "subject",
    "message_body",
    "email_to",
    "email_to_name",
    "email_from",
    "email_from_name",
    "reply_to",
];

pub const X_MAILER: &str = "OpenWebPresence-1.0";
pub const WORD_WRAP: usize = 50;
const DKIM_KEY_EXTENSION: &str = "pem";

/// Named string fields describing one message
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MailRequest {
    fields: HashMap<String, String>,
}

impl MailRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    /// Required fields absent from the request
    ///
    /// Presence is what counts; an empty value is accepted.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|key| !self.fields.contains_key(*key))
            .collect()
    }

    pub fn validate(&self) -> Result<(), FrameworkError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FrameworkError::Validation { missing })
        }
    }

    fn field(&self, key: &str) -> String {
        self.fields.get(key).cloned().unwrap_or_default()
    }
}

impl From<HashMap<String, String>> for MailRequest {
    fn from(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }
}

/// Strip every character that cannot appear in an e-mail address
pub fn sanitize_email(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-=?^_`{|}~@.[]".contains(*c))
        .collect()
}

/// Domain part of an address (after the last `@`)
fn recipient_domain(address: &str) -> Option<&str> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim_matches(|c| c == '[' || c == ']'))
        .filter(|d| !d.is_empty())
}

pub struct Messaging {
    env: Arc<EnvSettings>,
    key_dir: PathBuf,
    transport: Arc<dyn MailTransport>,
    resolver: Arc<dyn MxResolver>,
}

impl Messaging {
    /// `key_dir` is the directory holding `<DKIM_private>.pem`
    pub fn new(
        env: Arc<EnvSettings>,
        key_dir: PathBuf,
        transport: Arc<dyn MailTransport>,
        resolver: Arc<dyn MxResolver>,
    ) -> Self {
        Self {
            env,
            key_dir,
            transport,
            resolver,
        }
    }

    /// Deliver straight to the recipient domain's mail exchanger
    pub async fn send_direct(&self, request: &MailRequest) -> Result<(), FrameworkError> {
        request.validate()?;

        let email_to = sanitize_email(&request.field("email_to"));
        let domain = recipient_domain(&email_to).ok_or_else(|| {
            FrameworkError::Resolve(format!("recipient '{email_to}' has no domain"))
        })?;

        let records = self
            .resolver
            .mx_records(domain)
            .await
            .map_err(FrameworkError::Resolve)?;
        let exchange = mx::preferred_exchange(&records)
            .ok_or_else(|| FrameworkError::Resolve(format!("no MX records for {domain}")))?;
        let ip = self
            .resolver
            .resolve_ip(&exchange.exchange)
            .await
            .map_err(FrameworkError::Resolve)?;

        // connect to the address, verify TLS against the exchange name
        self.send_core(request, &ip.to_string(), &exchange.exchange)
            .await
    }

    /// Deliver through the configured SMTP relay
    pub async fn send_via_smtp(&self, request: &MailRequest) -> Result<(), FrameworkError> {
        request.validate()?;
        let relay = &self.env.smtp.hostname;
        self.send_core(request, relay, relay).await
    }

    async fn send_core(
        &self,
        request: &MailRequest,
        target: &str,
        tls_domain: &str,
    ) -> Result<(), FrameworkError> {
        let mut mail = self.outbound(request, target);
        mail.tls_domain = tls_domain.to_string();
        match self.transport.send(&mail).await {
            Ok(()) => {
                logger::log_info(&format!(
                    "[MAIL] Sent '{}' to {} via {}:{}",
                    mail.subject, mail.to.email, mail.host, mail.port
                ));
                Ok(())
            }
            Err(diagnostic) => {
                logger::log_error(&format!(
                    "[MAIL] Delivery to {} via {} failed: {diagnostic}",
                    mail.to.email, mail.host
                ));
                Err(FrameworkError::Transport(diagnostic))
            }
        }
    }

    /// Populate the transport record for `request`, delivered to `target`
    pub fn outbound(&self, request: &MailRequest, target: &str) -> OutboundMail {
        let smtp = &self.env.smtp;
        let dkim = &self.env.dkim;
        let sender_domain = request.field("sender_domain");
        let email_from = request.field("email_from");

        OutboundMail {
            host: target.to_string(),
            tls_domain: target.to_string(),
            port: smtp.port,
            credentials: smtp.auth.then(|| SmtpCredentials {
                username: smtp.username.clone(),
                password: smtp.password.clone(),
            }),
            security: (smtp.security != SmtpSecurity::None).then_some(smtp.security),
            x_mailer: X_MAILER.to_string(),
            helo: sender_domain.clone(),
            from: MailAddress {
                email: email_from.clone(),
                name: request.field("email_from_name"),
            },
            reply_to: sanitize_email(&request.field("reply_to")),
            to: MailAddress {
                email: sanitize_email(&request.field("email_to")),
                name: request.field("email_to_name"),
            },
            dkim: DkimParams {
                domain: dkim.domain.clone(),
                private_key_path: self
                    .key_dir
                    .join(format!("{}.{DKIM_KEY_EXTENSION}", dkim.private_key)),
                selector: dkim.selector.clone(),
                passphrase: dkim.passphrase.clone(),
                identity: dkim.identity.clone(),
            },
            word_wrap: WORD_WRAP,
            is_html: true,
            subject: request.field("subject"),
            body: request.field("message_body"),
            custom_headers: vec![
                (
                    "X-AntiAbuse".to_string(),
                    format!("This is a solicited email for {sender_domain}."),
                ),
                ("X-AntiAbuse".to_string(), email_from),
            ],
        }
    }
}
