// src/notify/email.rs
use std::time::Duration;

use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Mailer;
use crate::config::SmtpConfig;
use crate::errors::SendError;
use crate::render::RenderedDigest;

/// Implicit-TLS submission port; every other port negotiates STARTTLS.
const SMTPS_PORT: u16 = 465;

pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendError> {
    address.parse().map_err(|e: lettre::address::AddressError| SendError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

impl SmtpMailer {
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self, SendError> {
        let creds = Credentials::new(cfg.sender.clone(), cfg.password.clone());
        let builder = if cfg.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)
        }
        .map_err(|e| SendError::Transport(format!("invalid SMTP_SERVER: {e}")))?;

        let mailer = builder
            .port(cfg.port)
            .credentials(creds)
            .timeout(Some(Duration::from_secs(cfg.timeout_secs)))
            .build();

        let from = parse_mailbox(&cfg.sender)?;
        let to = cfg
            .recipients
            .iter()
            .map(|r| parse_mailbox(r))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { mailer, from, to })
    }

    pub fn build_message(&self, digest: &RenderedDigest) -> Result<Message, SendError> {
        build_message(&self.from, &self.to, digest)
    }
}

/// HTML digest with a short plain-text alternative.
pub fn build_message(
    from: &Mailbox,
    to: &[Mailbox],
    digest: &RenderedDigest,
) -> Result<Message, SendError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(digest.subject.clone());
    for rcpt in to {
        builder = builder.to(rcpt.clone());
    }

    let plain = format!(
        "{}\n\nThis digest is best viewed in an HTML-capable mail client.\n",
        digest.subject
    );
    builder
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_PLAIN)
                        .body(plain),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_HTML)
                        .body(digest.html.clone()),
                ),
        )
        .map_err(|e| SendError::Build(e.to_string()))
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, digest: &RenderedDigest) -> Result<(), SendError> {
        let msg = self.build_message(digest)?;
        self.mailer
            .send(msg)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        tracing::info!(recipients = self.to.len(), "digest emailed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
