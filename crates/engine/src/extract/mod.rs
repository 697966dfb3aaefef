//! Document extraction: file-type dispatch to plain text.
//!
//! Every supported file becomes a labelled block of text such as
//! `\n--- PDF: report.pdf ---\n...\n`. Unsupported types contribute nothing.
//! Extraction failures never propagate: they become an inline
//! `[Error reading <name>: <reason>]` marker so the model still sees that a
//! file was attached.

pub mod archive;
pub mod table;
pub mod word;

use std::path::Path;

use tracing::{debug, warn};

use crate::error::ExtractError;

/// Extensions read verbatim as UTF-8 text.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "py", "js", "html", "css", "json", "md", "c", "cpp", "java", "rs", "go", "ts", "tsx",
    "jsx", "sh", "yaml", "yml", "toml", "xml", "sql", "kt", "swift", "rb", "php",
];

/// Turns one file into model-ready text.
pub trait DocumentExtractor: Send + Sync {
    /// Labelled text for `path`, an inline error marker, or empty.
    fn extract(&self, path: &Path) -> String;
}

/// What an extension maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Word,
    Csv,
    Spreadsheet,
    Unsupported,
}

impl DocumentKind {
    /// Classify by extension, case-insensitively. No extension reads as text.
    pub fn of(path: &Path) -> Self {
        match extension(path).as_deref() {
            None => Self::Text,
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Word,
            Some("csv") => Self::Csv,
            Some("xlsx" | "xls") => Self::Spreadsheet,
            Some(ext) if TEXT_EXTENSIONS.contains(&ext) => Self::Text,
            Some(_) => Self::Unsupported,
        }
    }
}

/// Extractor backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct FileExtractor {
    table_preview_rows: usize,
}

impl FileExtractor {
    pub fn new(table_preview_rows: usize) -> Self {
        Self { table_preview_rows }
    }

    fn try_extract(&self, path: &Path, kind: DocumentKind) -> Result<String, ExtractError> {
        let name = display_name(path);
        let block = match kind {
            DocumentKind::Text => {
                let bytes = std::fs::read(path)?;
                format!("\n--- File: {name} ---\n{}\n", String::from_utf8_lossy(&bytes))
            }
            DocumentKind::Pdf => {
                let text =
                    pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf(e.to_string()))?;
                format!("\n--- PDF: {name} ---\n{text}\n")
            }
            DocumentKind::Word => {
                format!("\n--- Word: {name} ---\n{}\n", word::docx_text(path)?)
            }
            DocumentKind::Csv => {
                let preview = table::csv_preview(path, self.table_preview_rows)?;
                format!("\n--- CSV Data: {name} ---\n{}\n", preview.render())
            }
            DocumentKind::Spreadsheet => {
                let preview = table::spreadsheet_preview(path, self.table_preview_rows)?;
                format!("\n--- Excel Data: {name} ---\n{}\n", preview.render())
            }
            DocumentKind::Unsupported => String::new(),
        };
        Ok(block)
    }
}

impl Default for FileExtractor {
    fn default() -> Self {
        Self::new(20)
    }
}

impl DocumentExtractor for FileExtractor {
    fn extract(&self, path: &Path) -> String {
        let kind = DocumentKind::of(path);
        debug!(path = %path.display(), ?kind, "Extracting document");

        match self.try_extract(path, kind) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Document extraction failed");
                format!("\n[Error reading {}: {e}]\n", display_name(path))
            }
        }
    }
}

/// Final path component, as shown in block headers.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_by_extension() {
        assert_eq!(DocumentKind::of(Path::new("main.RS")), DocumentKind::Text);
        assert_eq!(DocumentKind::of(Path::new("Makefile")), DocumentKind::Text);
        assert_eq!(DocumentKind::of(Path::new("r.pdf")), DocumentKind::Pdf);
        assert_eq!(DocumentKind::of(Path::new("r.docx")), DocumentKind::Word);
        assert_eq!(DocumentKind::of(Path::new("r.csv")), DocumentKind::Csv);
        assert_eq!(DocumentKind::of(Path::new("r.xlsx")), DocumentKind::Spreadsheet);
        assert_eq!(DocumentKind::of(Path::new("photo.png")), DocumentKind::Unsupported);
    }

    #[test]
    fn text_file_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Shopping\nmilk").unwrap();

        let text = FileExtractor::default().extract(&path);
        assert_eq!(text, "\n--- File: notes.md ---\n# Shopping\nmilk\n");
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.txt");
        std::fs::write(&path, [b'o', b'k', 0xff, 0xfe]).unwrap();

        let text = FileExtractor::default().extract(&path);
        assert!(text.starts_with("\n--- File: blob.txt ---\nok"));
    }

    #[test]
    fn csv_block_has_header_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        std::fs::write(&path, "city,units\nDelhi,5\n").unwrap();

        let text = FileExtractor::default().extract(&path);
        assert_eq!(
            text,
            "\n--- CSV Data: sales.csv ---\n    city  units\n0  Delhi      5\n"
        );
    }

    #[test]
    fn unsupported_type_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"ID3").unwrap();

        assert_eq!(FileExtractor::default().extract(&path), "");
    }

    #[test]
    fn corrupt_pdf_yields_error_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let text = FileExtractor::default().extract(&path);
        assert!(text.starts_with("\n[Error reading broken.pdf: "));
        assert!(text.ends_with("]\n"));
    }

    #[test]
    fn missing_text_file_yields_error_marker() {
        let text = FileExtractor::default().extract(Path::new("/no/such/dir/gone.txt"));
        assert!(text.starts_with("\n[Error reading gone.txt: "));
    }
}
