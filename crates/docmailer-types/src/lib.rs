//! Shared types for the DocMailer campaign engine

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque back-reference to a row in the recipient source.
///
/// Only the store that produced the handle knows what the number means.
/// Everything else passes it back unchanged on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RowHandle(u64);

impl RowHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// One row of the recipient list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    /// Explicit override used for the first-name derivation
    #[serde(default)]
    pub full_name: String,
    pub subscription_date: NaiveDateTime,
    pub last_sent: Option<NaiveDateTime>,
    /// `None` means the response state is unknown
    pub responded: Option<bool>,
    #[serde(default)]
    pub is_canceled: bool,
    /// Raw outcome text of the most recent attempt
    #[serde(default)]
    pub last_sent_status: String,
    pub row: RowHandle,
    #[serde(default)]
    pub custom_fields: HashMap<String, String>,
}

impl Recipient {
    /// Create a recipient with no lifecycle history
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.into(),
            company: String::new(),
            position: String::new(),
            full_name: String::new(),
            subscription_date: Local::now().naive_local(),
            last_sent: None,
            responded: None,
            is_canceled: false,
            last_sent_status: String::new(),
            row: RowHandle::default(),
            custom_fields: HashMap::new(),
        }
    }

    /// First name used for personalization.
    ///
    /// `full_name` wins when it is non-blank, otherwise the first word of
    /// `display_name`, otherwise an empty string.
    pub fn first_name(&self) -> String {
        let explicit = self.full_name.trim();
        if !explicit.is_empty() {
            return explicit.to_string();
        }

        self.display_name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    pub fn is_active(&self) -> bool {
        !self.is_canceled
    }

    pub fn has_been_sent(&self) -> bool {
        self.last_sent.is_some()
    }

    pub fn has_responded(&self) -> bool {
        self.responded == Some(true)
    }

    /// Case-insensitive address comparison
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

/// Which recipients a campaign run targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    All,
    NotSent,
    NotResponded,
    Test,
    Specific(String),
    Thankyou,
}

impl SelectionMode {
    /// Thank-you runs send email only and never touch delivery bookkeeping
    pub fn is_thankyou(&self) -> bool {
        matches!(self, SelectionMode::Thankyou)
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::All => write!(f, "All"),
            SelectionMode::NotSent => write!(f, "NotSent"),
            SelectionMode::NotResponded => write!(f, "NotResponded"),
            SelectionMode::Test => write!(f, "Test"),
            SelectionMode::Specific(email) => write!(f, "Specific({})", email),
            SelectionMode::Thankyou => write!(f, "Thankyou"),
        }
    }
}

/// Result of a single delivery attempt, as written back to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_name_prefers_full_name_override() {
        let mut recipient = Recipient::new("Dr. Jane Doe", "jane@example.com");
        recipient.full_name = "  Janey ".to_string();

        assert_eq!(recipient.first_name(), "Janey");
    }

    #[test]
    fn test_first_name_falls_back_to_first_display_token() {
        let recipient = Recipient::new("  Jane   Doe ", "jane@example.com");
        assert_eq!(recipient.first_name(), "Jane");
    }

    #[test]
    fn test_first_name_blank_full_name_is_ignored() {
        let mut recipient = Recipient::new("Jane Doe", "jane@example.com");
        recipient.full_name = "   ".to_string();

        assert_eq!(recipient.first_name(), "Jane");
    }

    #[test]
    fn test_first_name_empty_when_no_name_available() {
        let recipient = Recipient::new("", "anon@example.com");
        assert_eq!(recipient.first_name(), "");
    }

    #[test]
    fn test_first_name_follows_display_name_changes() {
        let mut recipient = Recipient::new("Jane Doe", "jane@example.com");
        recipient.display_name = "Maria Silva".to_string();

        assert_eq!(recipient.first_name(), "Maria");
    }

    #[test]
    fn test_responded_and_last_sent_are_independent() {
        let mut recipient = Recipient::new("Jane", "jane@example.com");
        recipient.last_sent = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0));

        assert!(recipient.has_been_sent());
        assert_eq!(recipient.responded, None);
        assert!(!recipient.has_responded());
    }

    #[test]
    fn test_selection_mode_display() {
        assert_eq!(SelectionMode::NotSent.to_string(), "NotSent");
        assert_eq!(
            SelectionMode::Specific("a@x.com".to_string()).to_string(),
            "Specific(a@x.com)"
        );
        assert!(SelectionMode::Thankyou.is_thankyou());
        assert!(!SelectionMode::All.is_thankyou());
    }

    #[test]
    fn test_recipient_serialization_roundtrip() {
        let mut recipient = Recipient::new("Jane Doe", "jane@example.com");
        recipient
            .custom_fields
            .insert("Code".to_string(), "42".to_string());

        let json = serde_json::to_string(&recipient).unwrap();
        let parsed: Recipient = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, recipient);
    }
}
