use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::Notifier;
use crate::config::MailConfig;

/// Plain SMTP relay, one message per notification with every recipient in `To`.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid mail.from address {:?}", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, recipients: &[String], subject: &str, body_html: &str) -> Result<()> {
        let mut message = Message::builder().from(self.from.clone()).subject(subject);

        for recipient in recipients {
            let mailbox = recipient
                .parse::<Mailbox>()
                .with_context(|| format!("Invalid recipient address {recipient:?}"))?;
            message = message.to(mailbox);
        }

        let email = message
            .header(ContentType::TEXT_HTML)
            .body(body_html.to_string())
            .context("Failed to build mail message")?;

        self.transport
            .send(email)
            .await
            .context("SMTP delivery failed")?;

        Ok(())
    }
}

/// Writes notifications to the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipients: &[String], subject: &str, _body_html: &str) -> Result<()> {
        info!(
            event = "notification_logged",
            recipients = ?recipients,
            subject,
            "Mail disabled, notification not sent"
        );
        Ok(())
    }
}
