//! SMTP delivery through lettre

use crate::config::EmailConfig;
use crate::error::{DocMailerError, Result};
use crate::services::markdown::email_html;
use crate::workflow::traits::{Mailer, OutgoingEmail};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use std::time::Duration;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let builder = if config.enable_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        };
        let builder = builder.map_err(|e| DocMailerError::Config(format!("Failed to create SMTP transport: {}", e)))?;

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        let from = mailbox(&email.from_name, &email.from_email, "sender")?;
        let to = mailbox(&email.to_name, &email.to_email, "recipient")?;

        let html = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(email_html(&email.body));

        let builder = Message::builder().from(from).to(to).subject(&email.subject);

        let message = match email.attachment.as_deref().filter(|p| p.exists()) {
            Some(path) => {
                let bytes = std::fs::read(path)?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "attachment".to_string());
                let attachment = Attachment::new(file_name).body(bytes, attachment_content_type(path));

                builder.multipart(MultiPart::mixed().singlepart(html).singlepart(attachment))
            }
            None => builder.singlepart(html),
        };

        message.map_err(|e| DocMailerError::Delivery(format!("Failed to build email: {}", e)))
    }
}

fn mailbox(name: &str, email: &str, role: &str) -> Result<Mailbox> {
    let address: Address = email.trim().parse().map_err(|e| {
        DocMailerError::Validation(format!("Invalid {} address '{}': {}", role, email, e))
    })?;

    let name = name.trim();
    Ok(Mailbox::new((!name.is_empty()).then(|| name.to_string()), address))
}

fn attachment_content_type(path: &Path) -> ContentType {
    let is_pdf = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    let mime = if is_pdf { "application/pdf" } else { "application/octet-stream" };
    ContentType::parse(mime).unwrap_or(ContentType::TEXT_PLAIN)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        email.validate()?;
        let message = self.build_message(email)?;

        log::debug!("Sending '{}' to {} via {}", email.subject, email.to_email, self.describe());
        self.transport
            .send(message)
            .await
            .map_err(|e| DocMailerError::Delivery(format!("Failed to send email: {}", e)))?;

        Ok(())
    }

    async fn test_connection(&self) -> Result<bool> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| DocMailerError::ServiceUnavailable(format!("SMTP server unreachable: {}", e)))
    }

    fn describe(&self) -> String {
        format!(
            "{}:{} (SSL: {})",
            self.config.smtp_server, self.config.smtp_port, self.config.enable_ssl
        )
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.config.smtp_server)
            .field("port", &self.config.smtp_port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            enable_ssl: true,
            username: "me@example.com".to_string(),
            password: "secret".to_string(),
            timeout_secs: 30,
        }
    }

    fn email(attachment: Option<std::path::PathBuf>) -> OutgoingEmail {
        OutgoingEmail {
            subject: "Hello".to_string(),
            body: "# Hi\n\nBody".to_string(),
            to_email: "jane@example.com".to_string(),
            to_name: "Jane Doe".to_string(),
            from_email: "team@example.com".to_string(),
            from_name: "Team".to_string(),
            attachment,
        }
    }

    #[tokio::test]
    async fn test_describe_includes_host_and_port() {
        let mailer = SmtpMailer::new(config()).unwrap();
        assert_eq!(mailer.describe(), "smtp.example.com:587 (SSL: true)");
    }

    #[tokio::test]
    async fn test_build_message_without_attachment() {
        let mailer = SmtpMailer::new(config()).unwrap();
        let message = mailer.build_message(&email(None)).unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("text/html"));
        assert!(!raw.contains("multipart/mixed"));
    }

    #[tokio::test]
    async fn test_build_message_attaches_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Proposal-Jane.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let mailer = SmtpMailer::new(config()).unwrap();
        let message = mailer.build_message(&email(Some(path))).unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("Proposal-Jane.pdf"));
    }

    #[tokio::test]
    async fn test_build_message_skips_missing_attachment() {
        let mailer = SmtpMailer::new(config()).unwrap();
        let message = mailer
            .build_message(&email(Some("/nonexistent/file.pdf".into())))
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(!raw.contains("multipart/mixed"));
    }

    #[test]
    fn test_mailbox_rejects_invalid_address() {
        assert!(matches!(
            mailbox("Jane", "not-an-address", "recipient"),
            Err(DocMailerError::Validation(_))
        ));
    }
}
