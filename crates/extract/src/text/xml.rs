use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{Chunk, Error};

/// Every non empty text node after the first element becomes a chunk.
/// Elements left open at the end of the input are an error.
pub fn process_xml(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    let mut reader = Reader::from_reader(data);
    reader.trim_text(true);

    let mut chunks = Vec::new();
    let mut in_element = false;
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => {
                in_element = true;
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Empty(_) => in_element = true,
            Event::Text(text) if in_element => {
                let text = text.unescape()?;
                push_trimmed(&mut chunks, &text, source);
            }
            Event::CData(cdata) if in_element => {
                let text = String::from_utf8_lossy(&cdata);
                push_trimmed(&mut chunks, &text, source);
            }
            Event::Eof if depth > 0 => {
                let open = format!("{depth} unclosed element(s)");
                return Err(quick_xml::Error::UnexpectedEof(open).into());
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(chunks)
}

fn push_trimmed(chunks: &mut Vec<Chunk>, text: &str, source: &str) {
    let text = text.trim();
    if !text.is_empty() {
        chunks.push(Chunk::new(text, source));
    }
}
