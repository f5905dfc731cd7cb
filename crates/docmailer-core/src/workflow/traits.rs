//! Collaborator traits for the campaign runner
//!
//! The runner only talks to the outside world through these traits, so every
//! adapter (CSV file, SMTP, PDF service) can be swapped or mocked in tests.

use crate::error::{DocMailerError, Result};
use crate::services::template::Metadata;
use async_trait::async_trait;
use docmailer_types::{DeliveryOutcome, Recipient};
use std::path::{Path, PathBuf};

/// Persistent recipient list
pub trait RecipientStore: Send + Sync {
    /// All recipients in source order. Rows without an email are skipped.
    fn load_all(&self) -> Result<Vec<Recipient>>;

    /// Record the outcome of a delivery attempt on the recipient's row only
    fn update_status(&self, recipient: &Recipient, outcome: &DeliveryOutcome) -> Result<()>;

    /// Human readable name of the source, used in logs
    fn describe(&self) -> String;
}

/// Email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;

    /// Check that the transport is reachable without sending anything
    async fn test_connection(&self) -> Result<bool>;

    /// Transport description for operator output, e.g. `smtp.example.com:587 (TLS)`
    fn describe(&self) -> String;
}

/// Personalized document rendering
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Render `body` into a file inside `output_dir` and return its path
    async fn generate(
        &self,
        body: &str,
        output_dir: &Path,
        recipient: &Recipient,
        metadata: &Metadata,
    ) -> Result<PathBuf>;

    async fn health_check(&self) -> Result<bool>;
}

/// A fully rendered message handed to a [`Mailer`]
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub subject: String,
    /// Markdown body; mailers convert it to HTML
    pub body: String,
    pub to_email: String,
    pub to_name: String,
    pub from_email: String,
    pub from_name: String,
    pub attachment: Option<PathBuf>,
}

impl OutgoingEmail {
    /// Reject messages no transport could deliver
    pub fn validate(&self) -> Result<()> {
        if self.from_email.trim().is_empty() {
            return Err(DocMailerError::Validation(
                "Sender address is missing (set fromEmail in the email template)".to_string(),
            ));
        }

        self.from_email
            .trim()
            .parse::<lettre::Address>()
            .map_err(|e| {
                DocMailerError::Validation(format!("Invalid sender address '{}': {}", self.from_email, e))
            })?;

        self.to_email
            .trim()
            .parse::<lettre::Address>()
            .map_err(|e| {
                DocMailerError::Validation(format!("Invalid recipient address '{}': {}", self.to_email, e))
            })?;

        Ok(())
    }
}
