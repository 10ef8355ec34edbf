use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::{Chunk, Error};

static TEXT_BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p, h1, h2, h3, h4, h5, h6, li").expect("selector is valid css")
});

/// Page chrome that rarely holds the content we are after.
const CHROME: &[&str] = &["nav", "header", "footer"];

/// One chunk per paragraph, heading or list item outside of the
/// page navigation, header and footer.
pub fn process_html(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    let html = String::from_utf8_lossy(data);
    let doc = Html::parse_document(&html);

    Ok(text_blocks(&doc, CHROME)
        .map(|text| Chunk::new(text, source))
        .collect())
}

/// Trimmed, non empty text of every text block not nested in one
/// of the `skip` elements. In document order.
pub(crate) fn text_blocks<'a>(
    doc: &'a Html,
    skip: &'a [&'a str],
) -> impl Iterator<Item = String> + 'a {
    doc.select(&TEXT_BLOCKS)
        .filter(move |block| !inside_any(block, skip))
        .map(|block| block.text().collect::<String>().trim().to_owned())
        .filter(|text| !text.is_empty())
}

fn inside_any(element: &ElementRef, names: &[&str]) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| names.contains(&ancestor.value().name()))
}
