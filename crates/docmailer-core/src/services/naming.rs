//! Deterministic file names for generated documents

use crate::constants::DEFAULT_DOCUMENT_TITLE;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strip diacritics and characters that are not allowed in file names.
///
/// A name with nothing usable left yields the default document title.
pub fn sanitize_file_name(name: &str) -> String {
    let without_accents: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect();

    let sanitized: String = without_accents
        .chars()
        .filter(|c| !c.is_control() && !INVALID_FILE_NAME_CHARS.contains(c))
        .collect();

    match sanitized.trim() {
        "" => DEFAULT_DOCUMENT_TITLE.to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// `<title>-<recipient>.pdf` with both parts sanitized and spaces replaced
pub fn document_file_name(title: &str, display_name: &str) -> String {
    format!(
        "{}-{}.pdf",
        sanitize_file_name(title).replace(' ', "_"),
        sanitize_file_name(display_name).replace(' ', "_")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_diacritics() {
        assert_eq!(sanitize_file_name("João Conceição"), "Joao Conceicao");
        assert_eq!(sanitize_file_name("Ångström Müller"), "Angstrom Muller");
    }

    #[test]
    fn test_sanitize_removes_invalid_characters_and_trims() {
        assert_eq!(sanitize_file_name("  Report: Q1/Q2 <draft>? "), "Report Q1Q2 draft");
    }

    #[test]
    fn test_sanitize_empty_defaults_to_document() {
        assert_eq!(sanitize_file_name(""), "Document");
    }

    #[test]
    fn test_sanitize_defaults_when_nothing_usable_remains() {
        assert_eq!(sanitize_file_name("???"), "Document");
        assert_eq!(sanitize_file_name("   "), "Document");
        assert_eq!(document_file_name("Proposal", "???"), "Proposal-Document.pdf");
    }

    #[test]
    fn test_document_file_name() {
        assert_eq!(
            document_file_name("Proposta Comercial", "José da Silva"),
            "Proposta_Comercial-Jose_da_Silva.pdf"
        );
    }

    #[test]
    fn test_document_file_name_is_deterministic() {
        assert_eq!(
            document_file_name("Título", "Ana"),
            document_file_name("Título", "Ana")
        );
    }
}
