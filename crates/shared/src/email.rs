//! Digest delivery over SMTP.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

pub struct EmailSender {
    config: SmtpConfig,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    /// Check the sender and recipient addresses up front so a misconfigured run fails
    /// before anything is fetched or recorded.
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from_email
            .as_deref()
            .context("No sender address. Set SMTP_USER or EMAIL_FROM.")?
            .parse()
            .context("Invalid from email address")?;

        let to: Mailbox = config
            .to_email
            .as_deref()
            .context("No recipient address. Set EMAIL_TO.")?
            .parse()
            .context("Invalid to email address")?;

        Ok(Self { config, from, to })
    }

    /// Build the plain-text digest message.
    pub fn build_message(&self, subject: &str, body: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build email message")
    }

    /// Send the digest once. Failures are reported, never retried.
    pub async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let email = self.build_message(subject, body)?;
        let mailer = self.transport()?;

        mailer
            .send(email)
            .await
            .context("Failed to send email via SMTP")?;

        tracing::info!(
            to = %self.to,
            subject = subject,
            "Email sent successfully"
        );

        Ok(())
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self.config.host.as_str();

        let builder = match self.config.port {
            587 => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .context("Failed to create SMTP transport")?,
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .context("Failed to create SMTP transport")?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        }
        .port(self.config.port);

        let builder = match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(from: Option<&str>, to: Option<&str>) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: from.map(String::from),
            password: Some("secret".to_string()),
            from_email: from.map(String::from),
            to_email: to.map(String::from),
        }
    }

    #[test]
    fn test_build_plain_text_message() {
        let sender =
            EmailSender::new(config(Some("me@example.com"), Some("you@example.com"))).unwrap();
        let message = sender
            .build_message("Daily Digest — 2026-02-01", "Body text")
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: me@example.com"));
        assert!(raw.contains("To: you@example.com"));
        assert!(raw.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(raw.contains("Body text"));
    }

    #[test]
    fn test_missing_sender_is_rejected_at_construction() {
        let err = EmailSender::new(config(None, Some("you@example.com")))
            .err()
            .unwrap();
        assert!(err.to_string().contains("SMTP_USER"));
    }

    #[test]
    fn test_missing_recipient_is_rejected_at_construction() {
        let err = EmailSender::new(config(Some("me@example.com"), None))
            .err()
            .unwrap();
        assert!(err.to_string().contains("EMAIL_TO"));
    }

    #[test]
    fn test_unconfigured_environment_fails_before_any_article_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("digest.db");
        let config = crate::config::Config::from_lookup(|key| match key {
            "DIGEST_DB_PATH" => Some(db_path.to_string_lossy().to_string()),
            _ => None,
        })
        .unwrap();

        assert!(EmailSender::new(config.smtp.clone()).is_err());
        assert!(!db_path.exists());
    }

    #[test]
    fn test_invalid_recipient_is_an_error() {
        assert!(EmailSender::new(config(Some("me@example.com"), Some("not an address"))).is_err());
    }
}
