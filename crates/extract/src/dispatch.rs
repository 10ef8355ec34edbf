use url::Url;

use crate::document::{process_docx, process_epub, process_pdf, process_pptx};
use crate::text::{
    process_csv, process_html, process_json, process_text, process_xml, process_yaml,
};
use crate::Processor;

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Document formats that have a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// plain text and markdown
    Text,
    Html,
    Csv,
    Json,
    Yaml,
    Xml,
    Docx,
    Pptx,
    Pdf,
    Epub,
}

/// Matched as substrings, first hit wins.
const BY_CONTENT_TYPE: &[(&str, Format)] = &[
    ("text/html", Format::Html),
    ("text/csv", Format::Csv),
    ("application/json", Format::Json),
    ("application/x-yaml", Format::Yaml),
    ("text/markdown", Format::Text),
    ("text/plain", Format::Text),
    ("application/xml", Format::Xml),
    ("text/xml", Format::Xml),
    (DOCX, Format::Docx),
    (PPTX, Format::Pptx),
    ("application/pdf", Format::Pdf),
    ("application/epub+zip", Format::Epub),
];

const BY_EXTENSION: &[(&str, Format)] = &[
    (".md", Format::Text),
    (".markdown", Format::Text),
    (".txt", Format::Text),
    (".csv", Format::Csv),
    (".json", Format::Json),
    (".yaml", Format::Yaml),
    (".yml", Format::Yaml),
    (".html", Format::Html),
    (".htm", Format::Html),
    (".xml", Format::Xml),
    (".epub", Format::Epub),
    (".docx", Format::Docx),
    (".pptx", Format::Pptx),
    (".pdf", Format::Pdf),
];

impl Format {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_ascii_lowercase();
        BY_CONTENT_TYPE
            .iter()
            .find(|(key, _)| content_type.contains(key))
            .map(|(_, format)| *format)
    }

    /// `extension` includes the leading period, see [`file_extension`].
    pub fn from_extension(extension: &str) -> Option<Self> {
        BY_EXTENSION
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(extension))
            .map(|(_, format)| *format)
    }

    pub fn processor(self) -> Processor {
        match self {
            Format::Text => process_text,
            Format::Html => process_html,
            Format::Csv => process_csv,
            Format::Json => process_json,
            Format::Yaml => process_yaml,
            Format::Xml => process_xml,
            Format::Docx => process_docx,
            Format::Pptx => process_pptx,
            Format::Pdf => process_pdf,
            Format::Epub => process_epub,
        }
    }
}

pub fn processor_for_content_type(content_type: &str) -> Option<Processor> {
    Format::from_content_type(content_type).map(Format::processor)
}

pub fn processor_for_extension(extension: &str) -> Option<Processor> {
    Format::from_extension(extension).map(Format::processor)
}

/// Lower cased extension, including the period, of the last path segment.
/// Query and fragment of urls are ignored.
pub fn file_extension(url_or_path: &str) -> Option<String> {
    let path = match Url::parse(url_or_path) {
        Ok(url) => url.path().to_owned(),
        Err(_) => url_or_path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_owned(),
    };

    let name = path.rsplit('/').next().unwrap_or_default();
    let dot = name.rfind('.')?;
    Some(name[dot..].to_ascii_lowercase())
}

pub fn is_markdown(content_type: &str, source: &str) -> bool {
    if content_type.to_ascii_lowercase().contains("text/markdown") {
        return true;
    }
    matches!(
        file_extension(source).as_deref(),
        Some(".md") | Some(".markdown")
    )
}

/// Guess the content type of a local file from its first bytes.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }
    if data.starts_with(b"PK\x03\x04") {
        return "application/zip";
    }

    let head = &data[..data.len().min(512)];
    let start = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(head.len());
    let lowered = head[start..].to_ascii_lowercase();
    if lowered.starts_with(b"<!doctype html") || lowered.starts_with(b"<html") {
        return "text/html";
    }
    if lowered.starts_with(b"<?xml") {
        return "text/xml";
    }

    match std::str::from_utf8(head) {
        Ok(_) => "text/plain",
        // a multi byte character cut in half by the 512 byte window
        Err(e) if e.error_len().is_none() => "text/plain",
        Err(_) => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_of_urls_and_paths() {
        assert_eq!(
            file_extension("https://example.com/docs/Report.PDF?download=1#top").as_deref(),
            Some(".pdf")
        );
        assert_eq!(file_extension("/tmp/notes.md").as_deref(), Some(".md"));
        assert_eq!(file_extension("https://example.com/v1.2/page"), None);
        assert_eq!(file_extension("https://example.com"), None);
    }

    #[test]
    fn content_type_with_parameters() {
        assert_eq!(
            Format::from_content_type("Text/HTML; charset=utf-8"),
            Some(Format::Html)
        );
        assert_eq!(Format::from_content_type("text/markdown"), Some(Format::Text));
        assert!(processor_for_content_type("image/png").is_none());
    }

    #[test]
    fn known_extensions() {
        for ext in [".md", ".csv", ".json", ".yaml", ".yml", ".html", ".epub", ".PDF"] {
            assert!(processor_for_extension(ext).is_some(), "{ext}");
        }
        assert!(processor_for_extension(".exe").is_none());
    }

    #[test]
    fn markdown_detection() {
        assert!(is_markdown("text/markdown", "https://example.com/readme"));
        assert!(is_markdown("text/plain", "https://example.com/README.md"));
        assert!(!is_markdown("text/plain", "https://example.com/notes.txt"));
    }

    #[test]
    fn sniffing() {
        assert_eq!(sniff_content_type(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(sniff_content_type(b"PK\x03\x04rest"), "application/zip");
        assert_eq!(sniff_content_type(b"\n  <!DOCTYPE html><html>"), "text/html");
        assert_eq!(sniff_content_type(b"<?xml version=\"1.0\"?><a/>"), "text/xml");
        assert_eq!(sniff_content_type("héllo".as_bytes()), "text/plain");
        assert_eq!(sniff_content_type(&[0, 159, 146, 150]), "application/octet-stream");
    }
}
