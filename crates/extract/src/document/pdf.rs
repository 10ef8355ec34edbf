use std::panic::{self, UnwindSafe};

use tracing::debug;

use crate::{Chunk, Error};

/// One chunk per page with text, the source points at the page: `{source}#page={n}`
pub fn process_pdf(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    let pages = guarded(|| pdf_extract::extract_text_from_mem_by_pages(data))?;

    Ok(pages
        .iter()
        .enumerate()
        .filter_map(|(idx, text)| page_chunk(text, source, idx + 1))
        .collect())
}

/// `pdf-extract` panics on some malformed files
fn guarded<F>(extract: F) -> Result<Vec<String>, Error>
where
    F: FnOnce() -> Result<Vec<String>, pdf_extract::OutputError> + UnwindSafe,
{
    match panic::catch_unwind(extract) {
        Ok(res) => res.map_err(|e| Error::Pdf(e.to_string())),
        Err(_) => Err(Error::Pdf("malformed pdf, parser panicked".to_owned())),
    }
}

fn page_chunk(text: &str, source: &str, number: usize) -> Option<Chunk> {
    let text = text.trim();
    if text.is_empty() {
        debug!("skipping page {number} of {source}, no text");
        return None;
    }
    Some(Chunk::new(
        text.replace('\n', "\n\n"),
        format!("{source}#page={number}"),
    ))
}
