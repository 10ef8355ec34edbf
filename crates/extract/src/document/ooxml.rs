use quick_xml::events::Event;
use quick_xml::Reader;

use super::{open_archive, read_part};
use crate::{Chunk, Error};

const DOCX_BODY: &str = "word/document.xml";
const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// The text of all paragraphs in the document body as a single chunk.
pub fn process_docx(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    let mut archive = open_archive(data)?;
    let paragraphs = match read_part(&mut archive, DOCX_BODY)? {
        Some(xml) => paragraphs(&xml)?,
        None => Vec::new(),
    };
    Ok(joined(&paragraphs, source))
}

/// The text of all slides, in slide order, as a single chunk.
pub fn process_pptx(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    let mut archive = open_archive(data)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| Some((slide_number(name)?, name.to_owned())))
        .collect();
    slides.sort_unstable();

    let mut all = Vec::new();
    for (_, name) in slides {
        if let Some(xml) = read_part(&mut archive, &name)? {
            all.extend(paragraphs(&xml)?);
        }
    }
    Ok(joined(&all, source))
}

fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn joined(paragraphs: &[String], source: &str) -> Vec<Chunk> {
    let content: String = paragraphs.iter().map(|p| format!("{p} ")).collect();
    if content.trim().is_empty() {
        Vec::new()
    } else {
        vec![Chunk::new(content, source)]
    }
}

/// Trimmed text of every `<*:p>` element, empty paragraphs are skipped.
fn paragraphs(xml: &[u8]) -> Result<Vec<String>, Error> {
    let mut reader = Reader::from_reader(xml);
    let mut found = Vec::new();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"p" => current = Some(String::new()),
            Event::End(e) if e.local_name().as_ref() == b"p" => {
                if let Some(text) = current.take() {
                    let text = text.trim();
                    if !text.is_empty() {
                        found.push(text.to_owned());
                    }
                }
            }
            Event::Text(text) => {
                if let Some(paragraph) = current.as_mut() {
                    paragraph.push_str(&text.unescape()?);
                }
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(found)
}
