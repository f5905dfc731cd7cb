//! DocMailer Core Library
//!
//! Personalized document and email campaigns driven by a recipient list.
//! Contains the service adapters, template rendering and the campaign runner.

pub mod clients;
pub mod config;
pub mod constants;
pub mod error;
pub mod services;
pub mod workflow;

// Re-export main types for easy access
pub use config::DocMailerConfig;
pub use error::{DocMailerError, Result};

pub use clients::{CsvRecipientStore, PdfService, SmtpMailer};

pub use services::{CampaignStats, Template, TemplateKind, TemplateRenderer};

pub use workflow::{
    AttemptStatus,
    CampaignRunner,
    CampaignSettings,
    ConfigurationCheck,
    DocumentGenerator,
    Mailer,
    OutgoingEmail,
    RecipientResult,
    RecipientStore,
    RunReport,
    TargetOutcome,
};
