//! Service modules for business logic

pub mod markdown;
pub mod naming;
pub mod selection;
pub mod stats;
pub mod template;

pub use selection::{find_recipient, find_responded_recipient, select, RecipientLookup};
pub use stats::CampaignStats;
pub use template::{Metadata, RenderedEmail, Template, TemplateKind, TemplateRenderer};
