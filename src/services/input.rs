use base64::{Engine as _, engine::general_purpose};
use log::{debug, info};
use std::path::Path;
use thiserror::Error;

/// Inputs whose trimmed length is at or below this are rejected.
pub const MIN_TEXT_CHARS: usize = 10;

pub const ACCEPTED_EXTENSIONS: &[&str] = &["txt", "md", "json"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter at least 10 characters of legal text.")]
    TooShort,
    #[error("Unsupported file type '{0}'. Upload a .txt, .md or .json file.")]
    UnsupportedFileType(String),
    #[error("Could not read the uploaded file: {0}")]
    UnreadableFile(String),
}

/// Checks a submission. Accepted text is handed back untouched, not trimmed.
/// A byte-order mark counts as surrounding whitespace.
pub fn validate_submission(text: &str) -> Result<&str, InputError> {
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.chars().count() > MIN_TEXT_CHARS {
        Ok(text)
    } else {
        Err(InputError::TooShort)
    }
}

pub fn is_accepted_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ACCEPTED_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// Draft buffer behind the home screen.
#[derive(Debug, Default, Clone)]
pub struct InputCollector {
    draft: String,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_text(&mut self, text: String) {
        self.draft = text;
    }

    /// Replaces the draft with the contents of an uploaded file. The draft is
    /// left as it was when the upload is rejected.
    pub fn load_upload(&mut self, filename: &str, content_base64: &str) -> Result<usize, InputError> {
        let text = decode_upload(filename, content_base64)?;
        let chars = text.chars().count();
        info!("Loaded {} ({} chars) into the draft", filename, chars);
        self.draft = text;
        Ok(chars)
    }

    pub fn submit<'a>(&self, current_text: &'a str) -> Result<&'a str, InputError> {
        validate_submission(current_text)
    }
}

/// Decodes an uploaded file as text. Bytes that are not valid UTF-8 are
/// replaced rather than rejected, and a leading byte-order mark is dropped.
/// An empty file is unreadable so it never blanks the draft.
pub fn decode_upload(filename: &str, content_base64: &str) -> Result<String, InputError> {
    if filename.trim().is_empty() {
        return Err(InputError::UnreadableFile("no file was chosen".to_string()));
    }
    if !is_accepted_file(filename) {
        return Err(InputError::UnsupportedFileType(filename.to_string()));
    }

    let cleaned: String = content_base64.chars().filter(|c| !c.is_whitespace()).collect();
    debug!("Decoding upload {} ({} base64 chars)", filename, cleaned.len());

    let bytes = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| InputError::UnreadableFile(e.to_string()))?;

    let decoded = String::from_utf8_lossy(&bytes);
    let text = decoded.strip_prefix('\u{feff}').unwrap_or(&*decoded);
    if text.is_empty() {
        return Err(InputError::UnreadableFile("file is empty".to_string()));
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_characters_is_rejected_eleven_accepted() {
        assert_eq!(validate_submission("0123456789"), Err(InputError::TooShort));
        assert_eq!(validate_submission("0123456789a"), Ok("0123456789a"));
    }

    #[test]
    fn surrounding_whitespace_does_not_count() {
        assert_eq!(validate_submission("   0123456789   \n"), Err(InputError::TooShort));
        assert_eq!(validate_submission(""), Err(InputError::TooShort));
        assert_eq!(validate_submission("\u{feff}0123456789 "), Err(InputError::TooShort));
    }

    #[test]
    fn accepted_text_is_not_trimmed() {
        let text = "  The tenant shall pay all fees.  \n";
        assert_eq!(validate_submission(text), Ok(text));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 10 two-byte characters
        assert_eq!(validate_submission("éééééééééé"), Err(InputError::TooShort));
        assert!(validate_submission("ééééééééééé").is_ok());
    }

    #[test]
    fn file_extensions() {
        assert!(is_accepted_file("lease.txt"));
        assert!(is_accepted_file("terms.MD"));
        assert!(is_accepted_file("export.json"));
        assert!(!is_accepted_file("contract.pdf"));
        assert!(!is_accepted_file("README"));
    }

    #[test]
    fn upload_populates_draft() {
        let mut input = InputCollector::new();
        let encoded = general_purpose::STANDARD.encode("Non-compete for 5 years.");
        assert_eq!(input.load_upload("nda.txt", &encoded), Ok(24));
        assert_eq!(input.draft(), "Non-compete for 5 years.");
    }

    #[test]
    fn rejected_upload_keeps_draft() {
        let mut input = InputCollector::new();
        input.set_text("existing draft".to_string());

        let encoded = general_purpose::STANDARD.encode("%PDF-1.4");
        assert!(matches!(
            input.load_upload("contract.pdf", &encoded),
            Err(InputError::UnsupportedFileType(_))
        ));
        assert!(matches!(
            input.load_upload("contract.txt", "not base64!!"),
            Err(InputError::UnreadableFile(_))
        ));
        assert!(matches!(input.load_upload("", ""), Err(InputError::UnreadableFile(_))));
        assert_eq!(input.draft(), "existing draft");
    }

    #[test]
    fn empty_upload_keeps_draft() {
        let mut input = InputCollector::new();
        input.set_text("existing draft text".to_string());

        assert_eq!(
            input.load_upload("empty.txt", ""),
            Err(InputError::UnreadableFile("file is empty".to_string()))
        );
        let bom_only = general_purpose::STANDARD.encode([0xef, 0xbb, 0xbf]);
        assert!(matches!(
            input.load_upload("empty.txt", &bom_only),
            Err(InputError::UnreadableFile(_))
        ));
        assert_eq!(input.draft(), "existing draft text");
    }

    #[test]
    fn byte_order_mark_is_dropped() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"0123456789");
        let encoded = general_purpose::STANDARD.encode(&bytes);

        let mut input = InputCollector::new();
        assert_eq!(input.load_upload("clause.txt", &encoded), Ok(10));
        assert_eq!(input.draft(), "0123456789");
        assert_eq!(validate_submission(input.draft()), Err(InputError::TooShort));
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let encoded = general_purpose::STANDARD.encode([b'o', b'k', 0xff]);
        assert_eq!(decode_upload("a.txt", &encoded).unwrap(), "ok\u{fffd}");
    }
}
