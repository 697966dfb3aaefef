//! Paragraph text from Word (.docx) documents.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::ExtractError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Empty `<w:p/>` (with or without attributes) or a full paragraph element.
static PARAGRAPH: LazyLock<Result<Regex, regex_lite::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*[^/>])?>.*?</w:p>"));

/// Text runs, tabs and line breaks inside one paragraph.
static RUN: LazyLock<Result<Regex, regex_lite::Error>> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*[^/>])?>([^<]*)</w:t>|<w:tab(?:\s[^>]*)?/>|<w:br(?:\s[^>]*)?/>")
});

fn compiled(
    pattern: &'static LazyLock<Result<Regex, regex_lite::Error>>,
) -> Result<&'static Regex, ExtractError> {
    pattern.as_ref().map_err(|e| ExtractError::Word(e.to_string()))
}

/// Read the document body and return its paragraphs joined by newlines.
pub fn docx_text(path: &Path) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::Word(format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)?;
    paragraphs(&xml)
}

/// Split `word/document.xml` into paragraph strings.
pub fn paragraphs(xml: &str) -> Result<String, ExtractError> {
    let paragraph = compiled(&PARAGRAPH)?;
    let run = compiled(&RUN)?;

    let lines: Vec<String> = paragraph
        .find_iter(xml)
        .map(|p| {
            let mut text = String::new();
            for caps in run.captures_iter(p.as_str()) {
                match caps.get(1) {
                    Some(t) => text.push_str(&unescape(t.as_str())),
                    None if caps[0].starts_with("<w:tab") => text.push('\t'),
                    None => text.push('\n'),
                }
            }
            text
        })
        .collect();

    Ok(lines.join("\n"))
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
