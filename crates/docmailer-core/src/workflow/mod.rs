//! Campaign workflow

pub mod report;
pub mod runner;
pub mod traits;

pub use report::{AttemptStatus, ConfigurationCheck, RecipientResult, RunReport, TargetOutcome};
pub use runner::{CampaignRunner, CampaignSettings};
pub use traits::{DocumentGenerator, Mailer, OutgoingEmail, RecipientStore};
