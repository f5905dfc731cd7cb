//! PDF service client

use crate::config::PdfServiceConfig;
use crate::constants::{DEFAULT_DOCUMENT_AUTHOR, DEFAULT_DOCUMENT_TITLE};
use crate::error::{DocMailerError, Result};
use crate::services::markdown::{document_html, DEFAULT_DOCUMENT_CSS};
use crate::services::naming::document_file_name;
use crate::services::template::Metadata;
use crate::workflow::traits::DocumentGenerator;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use docmailer_types::Recipient;
use reqwest::{multipart, Client as HttpClient};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONVERT_HTML_PATH: &str = "/forms/chromium/convert/html";

/// Paper sizes accepted in the `pageSize` metadata key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

impl PageSize {
    /// Unknown or missing values fall back to A4
    pub fn from_metadata(metadata: &Metadata) -> Self {
        match metadata
            .get("pageSize")
            .map(|s| s.trim().to_uppercase())
            .as_deref()
        {
            Some("A3") => PageSize::A3,
            Some("A5") => PageSize::A5,
            Some("LETTER") => PageSize::Letter,
            Some("LEGAL") => PageSize::Legal,
            _ => PageSize::A4,
        }
    }

    /// Width and height in inches
    pub fn inches(&self) -> (f64, f64) {
        match self {
            PageSize::A3 => (11.69, 16.54),
            PageSize::A4 => (8.27, 11.69),
            PageSize::A5 => (5.83, 8.27),
            PageSize::Letter => (8.5, 11.0),
            PageSize::Legal => (8.5, 14.0),
        }
    }
}

/// Renders documents through an HTML-to-PDF conversion service
pub struct PdfService {
    config: PdfServiceConfig,
    http_client: HttpClient,
}

impl PdfService {
    pub fn new(config: PdfServiceConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Full HTML page for one document, with stylesheet and header logo resolved
    pub fn build_html(&self, body: &str, metadata: &Metadata) -> String {
        let css = load_stylesheet(metadata);
        let header = header_html(metadata);
        document_html(body, &css, &header)
    }

    /// Title, author and subject in the form the conversion service expects
    pub fn document_info(metadata: &Metadata) -> serde_json::Value {
        let value = |key: &str, default: &str| {
            metadata
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        serde_json::json!({
            "Title": value("title", DEFAULT_DOCUMENT_TITLE),
            "Author": value("author", DEFAULT_DOCUMENT_AUTHOR),
            "Subject": value("type", ""),
        })
    }

    /// Convert a rendered HTML page into PDF bytes
    pub async fn render_pdf(&self, html: String, metadata: &Metadata) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), CONVERT_HTML_PATH);
        let (width, height) = PageSize::from_metadata(metadata).inches();

        let html_part = multipart::Part::text(html)
            .file_name("index.html")
            .mime_str("text/html")?;

        let form = multipart::Form::new()
            .part("files", html_part)
            .text("paperWidth", width.to_string())
            .text("paperHeight", height.to_string())
            .text("printBackground", "true")
            .text("metadata", Self::document_info(metadata).to_string());

        let response = self.http_client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DocMailerError::ServiceUnavailable(format!(
                "PDF service returned {} - {}",
                status, error_text
            )));
        }

        let pdf_data = response.bytes().await?.to_vec();
        if !Self::validate_pdf(&pdf_data) {
            return Err(DocMailerError::Document(
                "PDF service response is not a PDF document".to_string(),
            ));
        }

        Ok(pdf_data)
    }

    /// Check PDF magic bytes
    pub fn validate_pdf(pdf_data: &[u8]) -> bool {
        pdf_data.len() >= 4 && pdf_data.starts_with(b"%PDF")
    }
}

#[async_trait]
impl DocumentGenerator for PdfService {
    async fn generate(
        &self,
        body: &str,
        output_dir: &Path,
        recipient: &Recipient,
        metadata: &Metadata,
    ) -> Result<PathBuf> {
        let title = metadata
            .get("title")
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_DOCUMENT_TITLE);
        let path = output_dir.join(document_file_name(title, &recipient.display_name));

        let html = self.build_html(body, metadata);
        let pdf = self.render_pdf(html, metadata).await?;

        tokio::fs::create_dir_all(output_dir).await?;
        tokio::fs::write(&path, &pdf).await.map_err(|e| {
            DocMailerError::Document(format!("Failed to write {}: {}", path.display(), e))
        })?;

        log::debug!("Wrote {} bytes to {}", pdf.len(), path.display());
        Ok(path)
    }

    /// Check PDF service health
    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));

        match self.http_client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false), // Connection failed
        }
    }
}

/// Metadata path as given, else relative to the working directory
fn resolve_asset(metadata: &Metadata, key: &str) -> Option<PathBuf> {
    let raw = metadata.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())?;
    let path = PathBuf::from(raw);
    if path.exists() {
        return Some(path);
    }

    let relative = std::env::current_dir().ok()?.join(raw);
    relative.exists().then_some(relative)
}

fn load_stylesheet(metadata: &Metadata) -> String {
    resolve_asset(metadata, "styleSheet")
        .and_then(|path| match std::fs::read_to_string(&path) {
            Ok(css) => Some(css),
            Err(e) => {
                log::warn!("Failed to read stylesheet {}: {}", path.display(), e);
                None
            }
        })
        .unwrap_or_else(|| DEFAULT_DOCUMENT_CSS.to_string())
}

fn header_html(metadata: &Metadata) -> String {
    let Some(path) = resolve_asset(metadata, "headerCenter") else {
        return String::new();
    };

    match std::fs::read(&path) {
        Ok(bytes) => format!(
            "<div class='header'>\n        <img src='data:{};base64,{}' alt='Logo' />\n    </div>",
            image_mime_type(&path),
            BASE64.encode(bytes)
        ),
        Err(e) => {
            log::warn!("Failed to read header image {}: {}", path.display(), e);
            String::new()
        }
    }
}

fn image_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> PdfService {
        PdfService::new(PdfServiceConfig {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn metadata(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_validate_pdf() {
        assert!(PdfService::validate_pdf(b"%PDF-1.4\n...rest of pdf..."));
        assert!(!PdfService::validate_pdf(b"Not a PDF file"));
        assert!(!PdfService::validate_pdf(b""));
        assert!(!PdfService::validate_pdf(b"AB"));
    }

    #[test]
    fn test_page_size_from_metadata() {
        assert_eq!(PageSize::from_metadata(&metadata(&[("pageSize", "letter")])), PageSize::Letter);
        assert_eq!(PageSize::from_metadata(&metadata(&[("pageSize", "A3")])), PageSize::A3);
        assert_eq!(PageSize::from_metadata(&metadata(&[("pageSize", "B5")])), PageSize::A4);
        assert_eq!(PageSize::from_metadata(&Metadata::new()), PageSize::A4);
    }

    #[test]
    fn test_document_info_defaults() {
        let info = PdfService::document_info(&metadata(&[("type", "Proposal")]));

        assert_eq!(info["Title"], "Document");
        assert_eq!(info["Author"], "DocMailer");
        assert_eq!(info["Subject"], "Proposal");
    }

    #[test]
    fn test_build_html_uses_default_css_without_stylesheet() {
        let html = service().build_html("# Title", &Metadata::new());

        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("font-family: Arial"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_build_html_embeds_stylesheet_and_logo() {
        let dir = TempDir::new().unwrap();
        let css = dir.path().join("style.css");
        let logo = dir.path().join("logo.jpg");
        std::fs::write(&css, "h1 { color: teal; }").unwrap();
        std::fs::write(&logo, [0xFF, 0xD8, 0xFF]).unwrap();

        let meta = metadata(&[
            ("styleSheet", css.to_str().unwrap()),
            ("headerCenter", logo.to_str().unwrap()),
        ]);
        let html = service().build_html("Body", &meta);

        assert!(html.contains("h1 { color: teal; }"));
        assert!(html.contains("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn test_missing_logo_is_ignored() {
        let meta = metadata(&[("headerCenter", "/nonexistent/logo.png")]);
        assert!(!service().build_html("Body", &meta).contains("<img"));
    }

    #[tokio::test]
    async fn test_health_check_unreachable_service() {
        let service = PdfService::new(PdfServiceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        })
        .unwrap();

        assert!(!service.health_check().await.unwrap());
    }
}
