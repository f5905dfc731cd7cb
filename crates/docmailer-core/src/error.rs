//! Error types for the DocMailer system

use thiserror::Error;

/// Main error type for all DocMailer operations
#[derive(Error, Debug)]
pub enum DocMailerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Recipient store error: {0}")]
    Store(String),

    #[error("Email delivery failed: {0}")]
    Delivery(String),

    #[error("Document generation failed: {0}")]
    Document(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type for DocMailer operations
pub type Result<T> = std::result::Result<T, DocMailerError>;
