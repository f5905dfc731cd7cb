//! CSV-backed recipient store

use crate::constants::{STATUS_COLUMN, STATUS_ERROR_PREFIX, STATUS_TIMESTAMP_FORMAT};
use crate::error::{DocMailerError, Result};
use crate::workflow::traits::RecipientStore;
use chrono::{Local, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use docmailer_types::{DeliveryOutcome, Recipient, RowHandle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Recipient list kept in a CSV file with a header row.
///
/// Row handles are 1-based record numbers where the header is record 1, so
/// the first recipient is row 2. Every call re-reads the file.
pub struct CsvRecipientStore {
    path: PathBuf,
}

/// Positions of the well-known columns in the header
#[derive(Debug)]
struct ColumnMap {
    name: Option<usize>,
    email: Option<usize>,
    company: Option<usize>,
    position: Option<usize>,
    full_name: Option<usize>,
    last_sent: Option<usize>,
    responded: Option<usize>,
    subscription_date: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &StringRecord) -> Self {
        Self {
            name: find_column(header, "DisplayName").or_else(|| find_column(header, "Name")),
            email: find_column(header, "Email").or_else(|| find_column(header, "EmailAddress")),
            company: find_column(header, "Company"),
            position: find_column(header, "Position"),
            full_name: find_column(header, "FullName").or_else(|| find_column(header, "FirstName")),
            last_sent: find_column(header, STATUS_COLUMN),
            responded: find_column(header, "Responded"),
            subscription_date: find_column(header, "SubscriptionDate"),
        }
    }

    fn is_standard(&self, index: usize) -> bool {
        [
            self.name,
            self.email,
            self.company,
            self.position,
            self.full_name,
            self.last_sent,
            self.responded,
            self.subscription_date,
        ]
        .contains(&Some(index))
    }
}

/// Interpretation of the `Responded` cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseToken {
    Canceled,
    Yes,
    No,
    Unknown,
}

fn parse_response(text: &str) -> ResponseToken {
    match text.trim().to_uppercase().as_str() {
        "CANCELED" | "-1" => ResponseToken::Canceled,
        "TRUE" | "1" | "YES" | "Y" => ResponseToken::Yes,
        "FALSE" | "0" | "NO" | "N" => ResponseToken::No,
        _ => ResponseToken::Unknown,
    }
}

fn find_column(header: &StringRecord, name: &str) -> Option<usize> {
    header.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn cell<'r>(record: &'r StringRecord, index: Option<usize>) -> &'r str {
    index.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}

impl CsvRecipientStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records including the header, in file order
    fn read_records(&self) -> Result<Vec<StringRecord>> {
        if !self.path.exists() {
            return Err(DocMailerError::NotFound(format!(
                "Recipient file not found: {}",
                self.path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record?);
        }
        Ok(records)
    }

    fn write_records(&self, records: &[StringRecord]) -> Result<()> {
        let mut tmp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp_path)?;
            for record in records {
                writer.write_record(record)?;
            }
            writer.flush()?;
        }

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            DocMailerError::Store(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn parse_recipient(
        &self,
        header: &StringRecord,
        columns: &ColumnMap,
        record: &StringRecord,
        row: RowHandle,
    ) -> Option<Recipient> {
        let email = cell(record, columns.email);
        if email.is_empty() {
            log::info!("{}: Skipping recipient - no email address provided.", row);
            return None;
        }

        let name = match cell(record, columns.name) {
            "" => email,
            name => name,
        };

        let mut recipient = Recipient::new(name, email);
        recipient.row = row;
        recipient.company = cell(record, columns.company).to_string();
        recipient.position = cell(record, columns.position).to_string();
        recipient.full_name = cell(record, columns.full_name).to_string();

        let status = cell(record, columns.last_sent);
        recipient.last_sent = parse_date(status);
        recipient.last_sent_status = status.to_string();

        if let Some(subscribed) = parse_date(cell(record, columns.subscription_date)) {
            recipient.subscription_date = subscribed;
        }

        match parse_response(cell(record, columns.responded)) {
            ResponseToken::Canceled => recipient.is_canceled = true,
            ResponseToken::Yes => recipient.responded = Some(true),
            ResponseToken::No => recipient.responded = Some(false),
            ResponseToken::Unknown => {}
        }

        let custom_fields: HashMap<String, String> = header
            .iter()
            .enumerate()
            .filter(|(index, _)| !columns.is_standard(*index))
            .filter_map(|(index, column)| {
                let column = column.trim();
                let value = record.get(index).map(str::trim).unwrap_or("");
                (!column.is_empty() && !value.is_empty())
                    .then(|| (column.to_string(), value.to_string()))
            })
            .collect();

        if !custom_fields.is_empty() {
            log::info!(
                "Recipient {} has {} custom fields.",
                recipient.display_name,
                custom_fields.len()
            );
        }
        recipient.custom_fields = custom_fields;

        Some(recipient)
    }
}

impl RecipientStore for CsvRecipientStore {
    fn load_all(&self) -> Result<Vec<Recipient>> {
        let records = self.read_records()?;
        let Some((header, rows)) = records.split_first() else {
            log::warn!("{} is empty", self.path.display());
            return Ok(Vec::new());
        };

        let columns = ColumnMap::from_header(header);
        if columns.email.is_none() {
            log::warn!(
                "No 'Email' or 'EmailAddress' column found in {}. All recipients will be skipped.",
                self.path.display()
            );
            return Ok(Vec::new());
        }

        let recipients = rows
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let row = RowHandle::new(index as u64 + 2);
                self.parse_recipient(header, &columns, record, row)
            })
            .collect();

        Ok(recipients)
    }

    fn update_status(&self, recipient: &Recipient, outcome: &DeliveryOutcome) -> Result<()> {
        let mut records = self.read_records()?;
        if records.is_empty() {
            return Err(DocMailerError::Store(format!(
                "{} has no header row",
                self.path.display()
            )));
        }

        let columns = ColumnMap::from_header(&records[0]);
        let index = recipient.row.get() as usize;
        if index < 2 || index > records.len() {
            return Err(DocMailerError::Store(format!(
                "{} does not exist in {}",
                recipient.row,
                self.path.display()
            )));
        }

        let current = cell(&records[index - 1], columns.email);
        if !recipient.email_matches(current) {
            return Err(DocMailerError::Store(format!(
                "{} no longer belongs to {} (found '{}')",
                recipient.row, recipient.email, current
            )));
        }

        let status_column = match columns.last_sent {
            Some(column) => column,
            None => {
                let column = records[0].len();
                records[0].push_field(STATUS_COLUMN);
                column
            }
        };

        let value = match outcome {
            DeliveryOutcome::Sent => Local::now().format(STATUS_TIMESTAMP_FORMAT).to_string(),
            DeliveryOutcome::Failed(message) => format!("{}{}", STATUS_ERROR_PREFIX, message),
        };

        let original = &records[index - 1];
        let mut updated = StringRecord::new();
        for column in 0..original.len().max(status_column + 1) {
            if column == status_column {
                updated.push_field(&value);
            } else {
                updated.push_field(original.get(column).unwrap_or(""));
            }
        }
        records[index - 1] = updated;

        self.write_records(&records)?;
        log::debug!("Recorded '{}' for {} at {}", value, recipient.email, recipient.row);
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (TempDir, CsvRecipientStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recipients.csv");
        std::fs::write(&path, contents).unwrap();
        (dir, CsvRecipientStore::new(path))
    }

    #[test]
    fn test_parse_response_tokens() {
        assert_eq!(parse_response(" canceled "), ResponseToken::Canceled);
        assert_eq!(parse_response("-1"), ResponseToken::Canceled);
        assert_eq!(parse_response("y"), ResponseToken::Yes);
        assert_eq!(parse_response("TRUE"), ResponseToken::Yes);
        assert_eq!(parse_response("0"), ResponseToken::No);
        assert_eq!(parse_response("no"), ResponseToken::No);
        assert_eq!(parse_response("maybe"), ResponseToken::Unknown);
        assert_eq!(parse_response(""), ResponseToken::Unknown);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .unwrap();
        assert_eq!(parse_date("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(parse_date("2024-03-05T14:30:00"), Some(expected));
        assert_eq!(parse_date("05/03/2024 14:30:00"), Some(expected));
        assert!(parse_date("2024-03-05").is_some());
        assert!(parse_date("ERROR: timeout").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_load_maps_columns_and_custom_fields() {
        let (_dir, store) = store_with(
            "Name,Email,Company,Responded,LastSent,Segment,Empty\n\
             Ana Silva,ana@x.com,Acme,yes,2024-01-02 10:00:00,vip,\n\
             ,bruno@x.com,,CANCELED,ERROR: boom,,\n",
        );

        let recipients = store.load_all().unwrap();
        assert_eq!(recipients.len(), 2);

        let ana = &recipients[0];
        assert_eq!(ana.row, RowHandle::new(2));
        assert_eq!(ana.company, "Acme");
        assert_eq!(ana.responded, Some(true));
        assert!(ana.last_sent.is_some());
        assert_eq!(ana.custom_fields.get("Segment").map(String::as_str), Some("vip"));
        assert!(!ana.custom_fields.contains_key("Empty"));

        let bruno = &recipients[1];
        assert_eq!(bruno.display_name, "bruno@x.com");
        assert!(bruno.is_canceled);
        assert!(bruno.last_sent.is_none());
        assert_eq!(bruno.last_sent_status, "ERROR: boom");
        assert_eq!(bruno.row, RowHandle::new(3));
    }

    #[test]
    fn test_load_skips_rows_without_email() {
        let (_dir, store) = store_with("DisplayName,EmailAddress\nNo Mail,\nAna,ana@x.com\n");

        let recipients = store.load_all().unwrap();

        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].email, "ana@x.com");
        assert_eq!(recipients[0].row, RowHandle::new(3));
    }

    #[test]
    fn test_load_without_email_column_yields_nothing() {
        let (_dir, store) = store_with("Name,Company\nAna,Acme\n");
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let store = CsvRecipientStore::new("/nonexistent/recipients.csv");
        assert!(matches!(store.load_all(), Err(DocMailerError::NotFound(_))));
    }

    #[test]
    fn test_update_status_adds_column_and_touches_one_row() {
        let (_dir, store) = store_with("Name,Email,Notes\nAna,ana@x.com,first\nBruno,bruno@x.com,second\n");
        let recipients = store.load_all().unwrap();

        store
            .update_status(&recipients[1], &DeliveryOutcome::Failed("timeout".to_string()))
            .unwrap();

        let contents = std::fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Name,Email,Notes,LastSent");
        assert_eq!(lines[1], "Ana,ana@x.com,first");
        assert_eq!(lines[2], "Bruno,bruno@x.com,second,ERROR: timeout");

        let reloaded = store.load_all().unwrap();
        assert_eq!(reloaded[1].last_sent_status, "ERROR: timeout");
        assert!(reloaded[1].last_sent.is_none());
        assert!(!reloaded[1].custom_fields.contains_key("LastSent"));
    }

    #[test]
    fn test_update_status_success_is_visible_on_reload() {
        let (_dir, store) = store_with("Name,Email,LastSent\nAna,ana@x.com,\n");
        let ana = store.load_all().unwrap().remove(0);

        store.update_status(&ana, &DeliveryOutcome::Sent).unwrap();

        let reloaded = store.load_all().unwrap().remove(0);
        assert!(reloaded.has_been_sent());
    }

    #[test]
    fn test_update_status_rejects_row_with_other_email() {
        let (_dir, store) = store_with("Name,Email\nAna,ana@x.com\n");
        let mut ana = store.load_all().unwrap().remove(0);
        ana.email = "someone@x.com".to_string();

        let err = store.update_status(&ana, &DeliveryOutcome::Sent).unwrap_err();
        assert!(matches!(err, DocMailerError::Store(_)));
    }

    #[test]
    fn test_update_status_rejects_unknown_row() {
        let (_dir, store) = store_with("Name,Email\nAna,ana@x.com\n");
        let mut ana = store.load_all().unwrap().remove(0);
        ana.row = RowHandle::new(9);

        assert!(store.update_status(&ana, &DeliveryOutcome::Sent).is_err());
    }
}
