//! Adapters for the recipient file, SMTP and the PDF service

pub mod pdf;
pub mod smtp;
pub mod spreadsheet;

pub use pdf::{PageSize, PdfService};
pub use smtp::SmtpMailer;
pub use spreadsheet::CsvRecipientStore;
