//! Results of campaign runs

use chrono::{DateTime, Local};
use docmailer_types::{Recipient, SelectionMode};
use std::path::PathBuf;
use uuid::Uuid;

/// What happened to one delivery attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptStatus {
    Sent,
    /// Dry run: everything up to delivery succeeded
    WouldSend,
    Failed(String),
}

impl AttemptStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, AttemptStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipientResult {
    pub email: String,
    pub name: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    /// Generated document, or the file a dry run would have produced
    pub document: Option<PathBuf>,
    pub status: AttemptStatus,
}

impl RecipientResult {
    pub fn failed(recipient: &Recipient, message: String) -> Self {
        Self {
            email: recipient.email.clone(),
            name: recipient.display_name.clone(),
            subject: None,
            from: None,
            document: None,
            status: AttemptStatus::Failed(message),
        }
    }
}

/// Summary of one invocation over a filtered recipient set
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: SelectionMode,
    pub dry_run: bool,
    pub loaded: usize,
    pub selected: usize,
    pub results: Vec<RecipientResult>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl RunReport {
    pub fn new(mode: SelectionMode, dry_run: bool, loaded: usize, selected: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            dry_run,
            loaded,
            selected,
            results: Vec::with_capacity(selected),
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Some(Local::now());
        self
    }
}

/// Result of a send aimed at one address
#[derive(Debug, Clone)]
pub enum TargetOutcome {
    /// Address not eligible; nothing was attempted
    Skipped { email: String, reason: String },
    Completed(RunReport),
}

/// Result of the `test-configuration` command
#[derive(Debug, Clone)]
pub struct ConfigurationCheck {
    pub dry_run: bool,
    pub to_email: String,
    pub subject: String,
    pub transport: String,
    pub delivery: AttemptStatus,
    pub smtp_reachable: bool,
    pub pdf_service_healthy: bool,
}
