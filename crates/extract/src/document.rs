//! Binary document formats. Office files and epubs are zip archives holding
//! xml or xhtml parts, pdfs are handed to `pdf-extract`.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::Error;

mod epub;
mod ooxml;
mod pdf;

pub use epub::process_epub;
pub use ooxml::{process_docx, process_pptx};
pub use pdf::process_pdf;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn open_archive(data: &[u8]) -> Result<Archive<'_>, Error> {
    Ok(ZipArchive::new(Cursor::new(data))?)
}

/// `Ok(None)` if the archive has no part with that name
fn read_part(archive: &mut Archive, name: &str) -> Result<Option<Vec<u8>>, Error> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(other) => return Err(other.into()),
    };

    let mut bytes = Vec::new();
    part.read_to_end(&mut bytes)
        .map_err(|source| Error::ArchivePart {
            part: name.to_owned(),
            source,
        })?;
    Ok(Some(bytes))
}
