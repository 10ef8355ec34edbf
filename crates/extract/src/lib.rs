//! Turns raw document bytes into plain text [`Chunk`]s.
//!
//! Every supported format has a processor with the same shape, see
//! [`Processor`]. Which one to use is decided by [`processor_for_content_type`]
//! or [`processor_for_extension`], or through the [`Format`] they map to.

use serde::{Deserialize, Serialize};

mod dispatch;
pub mod document;
pub mod markdown;
pub mod text;

pub use dispatch::{
    file_extension, is_markdown, processor_for_content_type, processor_for_extension,
    sniff_content_type, Format,
};
pub use document::{process_docx, process_epub, process_pdf, process_pptx};
pub use text::{process_csv, process_html, process_json, process_text, process_xml, process_yaml};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// url or `file://` path this was read from
    pub source: String,
}

impl Chunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

pub type Processor = fn(&[u8], &str) -> Result<Vec<Chunk>, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not parse csv, {0}")]
    Csv(#[from] csv::Error),
    #[error("Could not parse json, {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not parse yaml, {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Could not parse xml, {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Could not read document archive, {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Could not read part {part} of document archive, {source}")]
    ArchivePart {
        part: String,
        source: std::io::Error,
    },
    #[error("Could not extract text from pdf, {0}")]
    Pdf(String),
    #[error("EPUB contains no content")]
    EpubWithoutContent,
    #[error("Could not open epub item {0}, it is not in the archive")]
    EpubItemMissing(String),
}
