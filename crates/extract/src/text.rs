use crate::{Chunk, Error};

mod html;
mod json;
mod tabular;
mod xml;
mod yaml;

pub use html::process_html;
pub(crate) use html::text_blocks;
pub use json::process_json;
pub use tabular::process_csv;
pub use xml::process_xml;
pub use yaml::process_yaml;

/// The entire body as a single chunk, used for plain text and markdown.
pub fn process_text(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let content = String::from_utf8_lossy(data);
    Ok(vec![Chunk::new(content, source)])
}
