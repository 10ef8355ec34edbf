use percent_encoding::percent_decode_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::Html;

use super::{open_archive, read_part};
use crate::text::text_blocks;
use crate::{Chunk, Error};

const CONTAINER: &str = "META-INF/container.xml";
const SKIPPED: &[&str] = &["script", "style", "nav", "header", "footer"];

/// One chunk per (x)html content document listed in the package manifest.
pub fn process_epub(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    let mut archive = open_archive(data)?;

    let container = read_part(&mut archive, CONTAINER)?.ok_or(Error::EpubWithoutContent)?;
    let package_path = first_attribute(&container, b"rootfile", b"full-path")?
        .ok_or(Error::EpubWithoutContent)?;
    let package = read_part(&mut archive, &package_path)?.ok_or(Error::EpubWithoutContent)?;

    let base = package_path.rsplit_once('/').map_or("", |(dir, _)| dir);

    let mut chunks = Vec::new();
    for href in manifest_hrefs(&package)? {
        let href = href.split('#').next().unwrap_or_default();
        if !(href.ends_with(".xhtml") || href.ends_with(".html")) {
            continue;
        }

        let part = resolve(base, href);
        let item = read_part(&mut archive, &part)?.ok_or(Error::EpubItemMissing(part))?;
        let text = item_text(&item);
        if !text.is_empty() {
            chunks.push(Chunk::new(text, source));
        }
    }
    Ok(chunks)
}

/// Archive path of a manifest href, relative to the package directory
fn resolve(base: &str, href: &str) -> String {
    let href = percent_decode_str(href).decode_utf8_lossy();
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}

fn item_text(xhtml: &[u8]) -> String {
    let doc = Html::parse_document(&String::from_utf8_lossy(xhtml));
    text_blocks(&doc, SKIPPED)
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_owned()
}

fn manifest_hrefs(package: &[u8]) -> Result<Vec<String>, Error> {
    let mut reader = Reader::from_reader(package);
    let mut hrefs = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"item" => {
                if let Some(href) = attribute(&e, b"href")? {
                    hrefs.push(href);
                }
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(hrefs)
}

fn first_attribute(xml: &[u8], element: &[u8], key: &[u8]) -> Result<Option<String>, Error> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == element => {
                if let Some(value) = attribute(&e, key)? {
                    return Ok(Some(value));
                }
            }
            Event::Eof => return Ok(None),
            _ => (),
        }
        buf.clear();
    }
}

fn attribute(element: &BytesStart, key: &[u8]) -> Result<Option<String>, Error> {
    for attr in element.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
