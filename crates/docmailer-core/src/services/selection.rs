//! Recipient selection for each campaign mode

use docmailer_types::{Recipient, SelectionMode};

/// Outcome of looking up a single address for a targeted send
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientLookup<'a> {
    Found(&'a Recipient),
    NotFound,
    Canceled(&'a Recipient),
    NotResponded(&'a Recipient),
}

impl<'a> RecipientLookup<'a> {
    pub fn recipient(&self) -> Option<&'a Recipient> {
        match self {
            RecipientLookup::Found(r) => Some(r),
            _ => None,
        }
    }

    /// Operator-facing reason for a miss, `None` when found
    pub fn reason(&self, email: &str) -> Option<String> {
        match self {
            RecipientLookup::Found(_) => None,
            RecipientLookup::NotFound => Some(format!("No recipient with email {} was found", email)),
            RecipientLookup::Canceled(r) => Some(format!(
                "Recipient {} ({}) has canceled and will not be contacted",
                r.display_name, r.email
            )),
            RecipientLookup::NotResponded(r) => Some(format!(
                "Recipient {} ({}) has not responded yet",
                r.display_name, r.email
            )),
        }
    }
}

/// Recipients in scope for `mode`, in source order.
///
/// Canceled recipients are never selected.
pub fn select<'a>(all: &'a [Recipient], mode: &SelectionMode) -> Vec<&'a Recipient> {
    let active = all.iter().filter(|r| r.is_active());

    match mode {
        SelectionMode::All => active.collect(),
        SelectionMode::NotSent => active.filter(|r| !r.has_been_sent()).collect(),
        SelectionMode::NotResponded => active
            .filter(|r| r.has_been_sent() && !r.has_responded())
            .collect(),
        SelectionMode::Test => active.filter(|r| is_test_recipient(r)).collect(),
        SelectionMode::Thankyou => active.filter(|r| r.has_responded()).collect(),
        SelectionMode::Specific(email) => {
            let matches: Vec<&Recipient> = active.filter(|r| r.email_matches(email)).collect();
            if matches.len() > 1 {
                log::warn!(
                    "{} rows share the address {}; using the first one ({})",
                    matches.len(),
                    email,
                    matches[0].row
                );
            }
            matches.into_iter().take(1).collect()
        }
    }
}

fn is_test_recipient(recipient: &Recipient) -> bool {
    recipient.email.to_lowercase().contains("test")
        || recipient.display_name.to_lowercase().contains("test")
}

/// Find the first active row with `email`.
///
/// `Canceled` is only reported when every row with that address is canceled.
pub fn find_recipient<'a>(all: &'a [Recipient], email: &str) -> RecipientLookup<'a> {
    let mut matches = all.iter().filter(|r| r.email_matches(email)).peekable();
    let first = match matches.peek() {
        Some(first) => *first,
        None => return RecipientLookup::NotFound,
    };

    match matches.find(|r| r.is_active()) {
        Some(r) => RecipientLookup::Found(r),
        None => RecipientLookup::Canceled(first),
    }
}

/// Like [`find_recipient`], but only an active recipient who responded
/// qualifies. The first active responded row wins over earlier active rows.
pub fn find_responded_recipient<'a>(all: &'a [Recipient], email: &str) -> RecipientLookup<'a> {
    let lookup = find_recipient(all, email);
    let Some(first_active) = lookup.recipient() else {
        return lookup;
    };

    all.iter()
        .filter(|r| r.is_active() && r.email_matches(email))
        .find(|r| r.has_responded())
        .map(RecipientLookup::Found)
        .unwrap_or(RecipientLookup::NotResponded(first_active))
}
