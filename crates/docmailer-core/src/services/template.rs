//! Template loading, front-matter extraction and placeholder rendering

use crate::constants::{DEFAULT_DOCUMENT_TITLE, MONTHS_PT, SHORT_DATE_FORMAT};
use crate::error::{DocMailerError, Result};
use chrono::{Datelike, Local, NaiveDate};
use docmailer_types::Recipient;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Front-matter key/value pairs
pub type Metadata = BTreeMap<String, String>;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([^{}\r\n]+)\}\}").expect("placeholder regex is valid")
});

const FRONT_MATTER_DELIMITER: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Document,
    Email,
}

/// A template file split into metadata and body
#[derive(Debug, Clone)]
pub struct Template {
    pub kind: TemplateKind,
    pub name: String,
    pub source_path: PathBuf,
    /// Content with the front-matter block removed
    pub body: String,
    pub metadata: Metadata,
}

impl Template {
    /// Read and parse a template file
    pub fn load<P: AsRef<Path>>(path: P, kind: TemplateKind) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DocMailerError::Template(format!(
                "Failed to read template {}: {}",
                path.display(),
                e
            ))
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::debug!("Loaded {:?} template '{}' from {}", kind, name, path.display());
        Ok(Self::from_source(kind, name, path.to_path_buf(), &raw))
    }

    pub fn from_source(kind: TemplateKind, name: String, source_path: PathBuf, raw: &str) -> Self {
        let (metadata, body) = extract_metadata(raw);
        Self {
            kind,
            name,
            source_path,
            body,
            metadata,
        }
    }

    /// Metadata value or an empty string
    pub fn meta(&self, key: &str) -> &str {
        self.metadata.get(key).map(String::as_str).unwrap_or("")
    }

    /// Subject line; only email templates carry one
    pub fn subject(&self) -> &str {
        match self.kind {
            TemplateKind::Email => self.meta("subject"),
            TemplateKind::Document => "",
        }
    }

    pub fn title(&self) -> &str {
        match self.meta("title").trim() {
            "" => DEFAULT_DOCUMENT_TITLE,
            title => title,
        }
    }
}

/// Rendered email ready to hand to a mailer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
    pub from_email: String,
    pub from_name: String,
}

/// Split a leading `---` front-matter block from the body.
///
/// Never fails: without a complete block the metadata is empty and the body
/// is the input unchanged.
pub fn extract_metadata(raw: &str) -> (Metadata, String) {
    let mut lines = raw.split_inclusive('\n');

    let opening = match lines.next() {
        Some(line) if strip_line_ending(line) == FRONT_MATTER_DELIMITER => line,
        _ => return (Metadata::new(), raw.to_string()),
    };

    let mut consumed = opening.len();
    let mut block = Vec::new();

    for line in lines {
        consumed += line.len();
        let content = strip_line_ending(line);
        if content == FRONT_MATTER_DELIMITER {
            return (parse_front_matter(&block), raw[consumed..].to_string());
        }
        block.push(content);
    }

    // Unclosed block
    (Metadata::new(), raw.to_string())
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn parse_front_matter(lines: &[&str]) -> Metadata {
    let mut metadata = Metadata::new();

    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        metadata.insert(key.to_string(), strip_matching_quotes(value.trim()).to_string());
    }

    metadata
}

fn strip_matching_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Replace every known `{{Key}}` in a single left-to-right pass.
///
/// Substituted text is never scanned again and unknown tokens are copied
/// through untouched.
pub fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            rest = &rest[start..];
            break;
        };

        match values.get(&after_open[..end]) {
            Some(value) => {
                output.push_str(value);
                rest = &after_open[end + 2..];
            }
            None => {
                output.push_str("{{");
                rest = after_open;
            }
        }
    }

    output.push_str(rest);
    output
}

/// Distinct `{{...}}` tokens still present in rendered text
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for capture in PLACEHOLDER_RE.find_iter(text) {
        let token = capture.as_str().to_string();
        if !found.contains(&token) {
            found.push(token);
        }
    }
    found
}

/// `"<day> de <month> de <year>"` with Portuguese month names
pub fn format_date_long(date: NaiveDate) -> String {
    format!(
        "{} de {} de {}",
        date.day(),
        MONTHS_PT[date.month0() as usize],
        date.year()
    )
}

/// Personalizes template text for one recipient
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    today: NaiveDate,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Renderer whose current date is today's local date
    pub fn new() -> Self {
        Self::with_date(Local::now().date_naive())
    }

    pub fn with_date(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Render a body. Sender placeholders are only filled when `sender` is given.
    pub fn render(&self, body: &str, recipient: &Recipient, sender: Option<&Metadata>) -> String {
        substitute(body, &self.placeholder_values(recipient, sender))
    }

    pub fn render_subject(&self, subject: &str, recipient: &Recipient) -> String {
        self.render(subject, recipient, None)
    }

    pub fn render_document(&self, template: &Template, recipient: &Recipient) -> String {
        self.render(&template.body, recipient, None)
    }

    pub fn render_email(&self, template: &Template, recipient: &Recipient) -> RenderedEmail {
        RenderedEmail {
            subject: self.render_subject(template.subject(), recipient),
            body: self.render(&template.body, recipient, Some(&template.metadata)),
            from_email: template.meta("fromEmail").trim().to_string(),
            from_name: template.meta("fromName").trim().to_string(),
        }
    }

    fn placeholder_values(
        &self,
        recipient: &Recipient,
        sender: Option<&Metadata>,
    ) -> HashMap<String, String> {
        let mut values: HashMap<String, String> = recipient
            .custom_fields
            .iter()
            .map(|(key, value)| (key.clone(), value.trim().to_string()))
            .collect();

        // Built-in keys take precedence over custom columns of the same name
        let first_name = recipient.first_name();
        let builtins = [
            ("DisplayName", recipient.display_name.trim().to_string()),
            ("Name", recipient.display_name.trim().to_string()),
            ("FirstName", first_name.trim().to_string()),
            ("FullName", first_name.trim().to_string()),
            ("Email", recipient.email.trim().to_string()),
            ("Company", recipient.company.trim().to_string()),
            ("Position", recipient.position.trim().to_string()),
            (
                "SubscriptionDate",
                recipient.subscription_date.format(SHORT_DATE_FORMAT).to_string(),
            ),
            ("CurrentDate", self.today.format(SHORT_DATE_FORMAT).to_string()),
            ("CurrentDateLong", format_date_long(self.today)),
        ];

        for (key, value) in builtins {
            values.insert(key.to_string(), value);
        }

        if let Some(sender) = sender {
            for (placeholder, key) in [("FromName", "fromName"), ("FromEmail", "fromEmail")] {
                let value = sender.get(key).map(|v| v.trim()).unwrap_or("");
                values.insert(placeholder.to_string(), value.to_string());
            }
        }

        values
    }
}
