//! Configuration management for the DocMailer system

use crate::error::{DocMailerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `DOCMAILER__EMAIL__PASSWORD`
pub const ENV_PREFIX: &str = "DOCMAILER";

/// Main configuration structure, mirrors `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMailerConfig {
    pub email: EmailConfig,

    #[serde(alias = "excelFilePath", alias = "recipients_path")]
    pub recipients_path: PathBuf,

    #[serde(default = "default_output_directory", alias = "output_directory")]
    pub output_directory: PathBuf,

    #[serde(default = "default_document_template", alias = "document_template_path")]
    pub document_template_path: PathBuf,

    #[serde(default = "default_email_template", alias = "email_template_path")]
    pub email_template_path: PathBuf,

    #[serde(default = "default_thankyou_template", alias = "thankyou_template_path")]
    pub thankyou_template_path: PathBuf,

    #[serde(default, alias = "pdf_service")]
    pub pdf_service: PdfServiceConfig,

    /// Optional file that receives a copy of every log line
    #[serde(default, alias = "log_file")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    #[serde(alias = "smtp_server", alias = "host")]
    pub smtp_server: String,

    #[serde(default = "default_smtp_port", alias = "smtp_port", alias = "port")]
    pub smtp_port: u16,

    #[serde(default = "default_enable_ssl", alias = "enable_ssl")]
    pub enable_ssl: bool,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_smtp_timeout", alias = "timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfServiceConfig {
    #[serde(alias = "base_url", alias = "url")]
    pub base_url: String,

    #[serde(default = "default_pdf_timeout", alias = "timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PdfServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_pdf_base_url(),
            timeout_secs: default_pdf_timeout(),
        }
    }
}

// Default functions
fn default_output_directory() -> PathBuf {
    PathBuf::from("Output")
}

fn default_document_template() -> PathBuf {
    PathBuf::from("Templates/document.md")
}

fn default_email_template() -> PathBuf {
    PathBuf::from("Templates/email.md")
}

fn default_thankyou_template() -> PathBuf {
    PathBuf::from("Templates/thankyou.md")
}

fn default_smtp_port() -> u16 {
    587
}

fn default_enable_ssl() -> bool {
    true
}

fn default_smtp_timeout() -> u64 {
    30
}

fn default_pdf_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_pdf_timeout() -> u64 {
    60
}

impl DocMailerConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DocMailerError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_json_str(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DocMailerError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file and layer `DOCMAILER__*` environment variables on top.
    ///
    /// Nested keys are separated by a double underscore. Environment keys
    /// arrive lowercased, so they are matched against the file's keys ignoring
    /// case and underscores: `DOCMAILER__EMAIL__SMTP_SERVER` overrides
    /// `email.smtpServer` and `DOCMAILER__EMAIL__PASSWORD` overrides
    /// `email.password`.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocMailerError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DocMailerError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let mut value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| DocMailerError::Config(format!("Failed to parse config: {}", e)))?;

        let overrides: serde_json::Value = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| DocMailerError::Config(format!("Failed to read environment: {}", e)))?;

        merge_overrides(&mut value, overrides);

        let config: Self = serde_json::from_value(value)
            .map_err(|e| DocMailerError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.recipients_path.as_os_str().is_empty() {
            return Err(DocMailerError::Config(
                "Recipients file path (recipientsPath) is required".to_string(),
            ));
        }

        if self.email.smtp_server.trim().is_empty() {
            return Err(DocMailerError::Config(
                "SMTP server (email.smtpServer) is required".to_string(),
            ));
        }

        if self.email.smtp_port == 0 {
            return Err(DocMailerError::Config(
                "SMTP port must be greater than zero".to_string(),
            ));
        }

        if self.pdf_service.base_url.trim().is_empty() {
            return Err(DocMailerError::Config(
                "PDF service base URL is required".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Apply `overrides` onto `target`, matching keys that differ only in case or
/// underscores. Scalars replace the file value; a number or boolean landing on
/// a string field is kept as text.
fn merge_overrides(target: &mut serde_json::Value, overrides: serde_json::Value) {
    use serde_json::Value;

    let override_map = match overrides {
        Value::Object(map) => map,
        other => {
            *target = other;
            return;
        }
    };
    if !target.is_object() {
        *target = Value::Object(override_map);
        return;
    }
    let Some(target_map) = target.as_object_mut() else {
        return;
    };

    for (key, override_value) in override_map {
        let wanted = normalize_key(&key);
        let existing = target_map
            .keys()
            .find(|k| normalize_key(k) == wanted)
            .cloned()
            .unwrap_or(key);

        match target_map.get_mut(&existing) {
            Some(current) if current.is_object() => merge_overrides(current, override_value),
            Some(current) if current.is_string() => {
                *current = match override_value {
                    Value::Number(n) => Value::String(n.to_string()),
                    Value::Bool(b) => Value::String(b.to_string()),
                    other => other,
                }
            }
            Some(current) => *current = override_value,
            None => {
                target_map.insert(existing, override_value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_matches_keys_ignoring_case_and_underscores() {
        let mut value = json!({
            "email": { "smtpServer": "smtp.example.com", "smtpPort": 587 },
            "recipientsPath": "recipients.csv"
        });

        merge_overrides(
            &mut value,
            json!({ "email": { "smtp_server": "smtp.override.com", "smtpport": 2525 } }),
        );

        assert_eq!(value["email"]["smtpServer"], "smtp.override.com");
        assert_eq!(value["email"]["smtpPort"], 2525);
        assert!(value["email"].get("smtp_server").is_none());
        assert_eq!(value["recipientsPath"], "recipients.csv");
    }

    #[test]
    fn test_merge_keeps_numeric_override_as_text_for_string_fields() {
        let mut value = json!({ "email": { "password": "from-file" } });

        merge_overrides(&mut value, json!({ "email": { "password": 123456 } }));

        assert_eq!(value["email"]["password"], "123456");
    }

    #[test]
    fn test_merge_inserts_unknown_keys() {
        let mut value = json!({ "email": { "smtpServer": "smtp.example.com" } });

        merge_overrides(&mut value, json!({ "log_file": "Logs/run.log" }));

        assert_eq!(value["log_file"], "Logs/run.log");
        let config: DocMailerConfig = serde_json::from_value(json!({
            "email": value["email"].clone(),
            "recipientsPath": "r.csv",
            "log_file": value["log_file"].clone()
        }))
        .unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("Logs/run.log")));
    }
}
