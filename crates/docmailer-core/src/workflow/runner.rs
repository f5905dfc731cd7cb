//! Campaign runner: load, filter, render, deliver and record outcomes

use super::report::{AttemptStatus, ConfigurationCheck, RecipientResult, RunReport, TargetOutcome};
use super::traits::{DocumentGenerator, Mailer, OutgoingEmail, RecipientStore};
use crate::config::DocMailerConfig;
use crate::error::Result;
use crate::services::naming::document_file_name;
use crate::services::selection::{find_recipient, find_responded_recipient, select};
use crate::services::stats::CampaignStats;
use crate::services::template::{unresolved_placeholders, Template, TemplateKind, TemplateRenderer};
use docmailer_types::{DeliveryOutcome, Recipient, SelectionMode};
use std::path::PathBuf;
use std::sync::Arc;

const TEST_EMAIL_SUBJECT: &str = "DocMailer Test - {{Name}}";
const TEST_EMAIL_BODY: &str =
    "# Test Email\n\nThis is a test email from DocMailer.\n\n**Name:** {{Name}}\n**Email:** {{Email}}";
const TEST_SENDER_NAME: &str = "DocMailer Test";

/// File locations the runner needs for one invocation
#[derive(Debug, Clone)]
pub struct CampaignSettings {
    pub output_directory: PathBuf,
    pub document_template_path: PathBuf,
    pub email_template_path: PathBuf,
    pub thankyou_template_path: PathBuf,
    /// Address the configuration test mails to and from
    pub test_address: String,
}

impl CampaignSettings {
    pub fn from_config(config: &DocMailerConfig) -> Self {
        Self {
            output_directory: config.output_directory.clone(),
            document_template_path: config.document_template_path.clone(),
            email_template_path: config.email_template_path.clone(),
            thankyou_template_path: config.thankyou_template_path.clone(),
            test_address: config.email.username.clone(),
        }
    }
}

/// Templates used by one run. Thank-you runs carry no document template.
struct RunTemplates {
    document: Option<Template>,
    email: Template,
}

/// Orchestrates one invocation over the recipient list.
///
/// Recipients are processed one at a time. Each ends as exactly one success
/// or one error, and in real mode (outside thank-you flows) exactly one
/// status write follows. A dry run performs the same reads and rendering but
/// never generates, sends or writes.
pub struct CampaignRunner {
    store: Arc<dyn RecipientStore>,
    mailer: Arc<dyn Mailer>,
    documents: Arc<dyn DocumentGenerator>,
    settings: CampaignSettings,
    renderer: TemplateRenderer,
    dry_run: bool,
}

impl CampaignRunner {
    pub fn new(
        store: Arc<dyn RecipientStore>,
        mailer: Arc<dyn Mailer>,
        documents: Arc<dyn DocumentGenerator>,
        settings: CampaignSettings,
    ) -> Self {
        Self {
            store,
            mailer,
            documents,
            settings,
            renderer: TemplateRenderer::new(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_renderer(mut self, renderer: TemplateRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Process every recipient selected by `mode`
    pub async fn run(&self, mode: SelectionMode) -> Result<RunReport> {
        log::info!("Starting recipient processing in {} mode{}", mode, self.dry_run_suffix());

        let all = self.load()?;
        let selected = select(&all, &mode);
        log::info!(
            "Selected {} recipients for processing based on {} mode",
            selected.len(),
            mode
        );

        self.process(mode, all.len(), selected).await
    }

    /// Send the campaign to one address
    pub async fn send_to(&self, email: &str) -> Result<TargetOutcome> {
        log::info!("Sending to {}{}", email, self.dry_run_suffix());

        let all = self.load()?;
        let lookup = find_recipient(&all, email);
        if let Some(reason) = lookup.reason(email) {
            log::warn!("{}", reason);
            return Ok(TargetOutcome::Skipped {
                email: email.to_string(),
                reason,
            });
        }

        let mode = SelectionMode::Specific(email.to_string());
        let selected = select(&all, &mode);
        let report = self.process(mode, all.len(), selected).await?;
        Ok(TargetOutcome::Completed(report))
    }

    /// Send the thank-you email to one address that has responded
    pub async fn send_thankyou_to(&self, email: &str) -> Result<TargetOutcome> {
        log::info!("Sending thank-you to {}{}", email, self.dry_run_suffix());

        let all = self.load()?;
        let lookup = find_responded_recipient(&all, email);
        let recipient = match lookup.recipient() {
            Some(recipient) => recipient,
            None => {
                let reason = lookup.reason(email).unwrap_or_default();
                log::warn!("{}", reason);
                return Ok(TargetOutcome::Skipped {
                    email: email.to_string(),
                    reason,
                });
            }
        };

        let report = self
            .process(SelectionMode::Thankyou, all.len(), vec![recipient])
            .await?;
        Ok(TargetOutcome::Completed(report))
    }

    /// Aggregate counters over the whole recipient list
    pub fn stats(&self) -> Result<CampaignStats> {
        let all = self.load()?;
        Ok(CampaignStats::from_recipients(&all))
    }

    /// Send (or in dry run, validate) a test email to the configured account
    pub async fn test_configuration(&self) -> Result<ConfigurationCheck> {
        log::info!("Testing configuration{}", self.dry_run_suffix());

        let mut recipient = Recipient::new("Test User", self.settings.test_address.clone());
        recipient.company = "Test Company".to_string();
        recipient.position = "Developer".to_string();

        let email = OutgoingEmail {
            subject: self.renderer.render_subject(TEST_EMAIL_SUBJECT, &recipient),
            body: self.renderer.render(TEST_EMAIL_BODY, &recipient, None),
            to_email: recipient.email.clone(),
            to_name: recipient.display_name.clone(),
            from_email: self.settings.test_address.clone(),
            from_name: TEST_SENDER_NAME.to_string(),
            attachment: None,
        };

        let delivery = match self.deliver(&email).await {
            Ok(status) => status,
            Err(e) => {
                log::error!("Configuration test failed: {}", e);
                AttemptStatus::Failed(e.to_string())
            }
        };

        let smtp_reachable = match self.mailer.test_connection().await {
            Ok(reachable) => reachable,
            Err(e) => {
                log::warn!("SMTP connection test failed: {}", e);
                false
            }
        };

        let pdf_service_healthy = match self.documents.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                log::warn!("PDF service health check failed: {}", e);
                false
            }
        };

        Ok(ConfigurationCheck {
            dry_run: self.dry_run,
            to_email: email.to_email,
            subject: email.subject,
            transport: self.mailer.describe(),
            delivery,
            smtp_reachable,
            pdf_service_healthy,
        })
    }

    fn load(&self) -> Result<Vec<Recipient>> {
        let all = self.store.load_all()?;
        log::info!("Found {} total recipients in {}", all.len(), self.store.describe());
        Ok(all)
    }

    fn load_templates(&self, thankyou: bool) -> Result<RunTemplates> {
        if thankyou {
            return Ok(RunTemplates {
                document: None,
                email: Template::load(&self.settings.thankyou_template_path, TemplateKind::Email)?,
            });
        }

        Ok(RunTemplates {
            document: Some(Template::load(
                &self.settings.document_template_path,
                TemplateKind::Document,
            )?),
            email: Template::load(&self.settings.email_template_path, TemplateKind::Email)?,
        })
    }

    async fn process(
        &self,
        mode: SelectionMode,
        loaded: usize,
        selected: Vec<&Recipient>,
    ) -> Result<RunReport> {
        let thankyou = mode.is_thankyou();
        let mut report = RunReport::new(mode, self.dry_run, loaded, selected.len());

        if selected.is_empty() {
            log::info!("No recipients to process");
            return Ok(report.finish());
        }

        let templates = self.load_templates(thankyou)?;

        for recipient in selected {
            log::info!("Processing: {} ({})", recipient.display_name, recipient.email);

            let result = match self.process_recipient(recipient, &templates).await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("Error processing {}: {}", recipient.display_name, e);
                    RecipientResult::failed(recipient, e.to_string())
                }
            };

            if !self.dry_run && !thankyou {
                let outcome = match &result.status {
                    AttemptStatus::Failed(message) => DeliveryOutcome::Failed(message.clone()),
                    _ => DeliveryOutcome::Sent,
                };

                if let Err(e) = self.store.update_status(recipient, &outcome) {
                    log::error!(
                        "Failed to record status for {}; aborting run after {} successes and {} errors",
                        recipient.email,
                        report.succeeded(),
                        report.failed()
                    );
                    return Err(e);
                }
            }

            report.results.push(result);
        }

        log::info!(
            "{}. Successes: {}, Errors: {}",
            if self.dry_run { "Dry run completed" } else { "Processing completed" },
            report.succeeded(),
            report.failed()
        );

        Ok(report.finish())
    }

    async fn process_recipient(
        &self,
        recipient: &Recipient,
        templates: &RunTemplates,
    ) -> Result<RecipientResult> {
        let document = match &templates.document {
            Some(template) => {
                let body = self.renderer.render_document(template, recipient);
                warn_unresolved("document", &body, recipient);

                let path = if self.dry_run {
                    let path = self
                        .settings
                        .output_directory
                        .join(document_file_name(template.title(), &recipient.display_name));
                    log::info!("[DRY RUN] Would generate PDF: {}", path.display());
                    path
                } else {
                    let path = self
                        .documents
                        .generate(&body, &self.settings.output_directory, recipient, &template.metadata)
                        .await?;
                    log::info!("PDF generated: {}", path.display());
                    path
                };
                Some(path)
            }
            None => None,
        };

        let rendered = self.renderer.render_email(&templates.email, recipient);
        warn_unresolved("email", &rendered.body, recipient);
        warn_unresolved("subject", &rendered.subject, recipient);

        let email = OutgoingEmail {
            subject: rendered.subject,
            body: rendered.body,
            to_email: recipient.email.trim().to_string(),
            to_name: recipient.display_name.trim().to_string(),
            from_email: rendered.from_email,
            from_name: rendered.from_name,
            attachment: document.clone(),
        };

        let status = self.deliver(&email).await?;

        Ok(RecipientResult {
            email: recipient.email.clone(),
            name: recipient.display_name.clone(),
            from: Some(format!("{} <{}>", email.from_name, email.from_email)),
            subject: Some(email.subject),
            document,
            status,
        })
    }

    async fn deliver(&self, email: &OutgoingEmail) -> Result<AttemptStatus> {
        email.validate()?;

        if self.dry_run {
            log::info!("[DRY RUN] Would send email to: {}", email.to_email);
            log::info!("[DRY RUN] Subject: {}", email.subject);
            log::info!("[DRY RUN] From: {} <{}>", email.from_name, email.from_email);
            return Ok(AttemptStatus::WouldSend);
        }

        self.mailer.send(email).await?;
        log::info!("Email sent to: {}", email.to_email);
        Ok(AttemptStatus::Sent)
    }

    fn dry_run_suffix(&self) -> &'static str {
        if self.dry_run {
            " (DRY RUN)"
        } else {
            ""
        }
    }
}

fn warn_unresolved(part: &str, text: &str, recipient: &Recipient) {
    let tokens = unresolved_placeholders(text);
    if !tokens.is_empty() {
        log::warn!(
            "Unresolved placeholders in {} for {}: {}",
            part,
            recipient.email,
            tokens.join(", ")
        );
    }
}
