//! Document context: one file or archive turned into bounded text.

use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::extract::archive::{self, ArchiveKind};
use crate::extract::{DocumentExtractor, display_name};

/// Text for the attached document, before truncation.
///
/// Archives are unpacked into a scratch directory next to the archive and
/// every member is extracted, walking depth-first with each directory's
/// entries sorted by file name. The scratch directory is removed before this
/// returns, whatever happened. A path that does not exist contributes nothing.
pub fn document_context(path: &Path, extractor: &dyn DocumentExtractor) -> String {
    if !path.exists() {
        debug!(path = %path.display(), "Document path missing; no document context");
        return String::new();
    }

    if ArchiveKind::of(path).is_none() {
        return extractor.extract(path);
    }

    archive_context(path, extractor).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Archive extraction failed");
        format!("\n[Archive Extraction Error: {e}]\n")
    })
}

fn archive_context(path: &Path, extractor: &dyn DocumentExtractor) -> Result<String, ExtractError> {
    let scratch = scratch_dir(path)?;
    archive::unpack_archive(path, scratch.path())?;

    let mut context = format!("\n[ARCHIVE CONTENTS - {}]:\n", display_name(path));
    let members = archive::member_files(scratch.path());
    debug!(archive = %path.display(), members = members.len(), "Archive unpacked");

    for member in &members {
        context.push_str(&extractor.extract(member));
    }
    Ok(context)
}

fn scratch_dir(archive: &Path) -> std::io::Result<TempDir> {
    let parent = archive
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    tempfile::Builder::new().prefix("ext_").tempdir_in(parent)
}

/// Cap `context` at `max_chars` characters, appending `marker` when cut.
pub fn truncate_context(context: String, max_chars: usize, marker: &str) -> String {
    match context.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut truncated = context[..cut].to_string();
            truncated.push_str(marker);
            truncated
        }
        None => context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FileExtractor;
    use std::fs::File;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn scratch_dirs_in(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("ext_"))
            .count()
    }

    #[test]
    fn zip_members_are_listed_under_archive_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        write_zip(&path, &[("a.txt", "hi")]);

        let text = document_context(&path, &FileExtractor::default());
        assert_eq!(
            text,
            "\n[ARCHIVE CONTENTS - bundle.zip]:\n\n--- File: a.txt ---\nhi\n"
        );
        assert_eq!(scratch_dirs_in(dir.path()), 0);
    }

    #[test]
    fn members_follow_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.zip");
        write_zip(&path, &[("zeta.txt", "last"), ("alpha.txt", "first"), ("mid/beta.md", "middle")]);

        let text = document_context(&path, &FileExtractor::default());
        let alpha = text.find("--- File: alpha.txt ---").unwrap();
        let beta = text.find("--- File: beta.md ---").unwrap();
        let zeta = text.find("--- File: zeta.txt ---").unwrap();
        assert!(alpha < beta && beta < zeta);
    }

    #[test]
    fn seven_zip_members_are_extracted() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("todo.txt"), "buy atta").unwrap();
        std::fs::create_dir(src.path().join("code")).unwrap();
        std::fs::write(src.path().join("code").join("main.go"), "package main").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.7z");
        sevenz_rust::compress_to_path(src.path(), &path).unwrap();

        let text = document_context(&path, &FileExtractor::default());
        assert!(text.starts_with("\n[ARCHIVE CONTENTS - bundle.7z]:\n"));
        assert!(text.contains("\n--- File: main.go ---\npackage main\n"));
        assert!(text.contains("\n--- File: todo.txt ---\nbuy atta\n"));
        assert!(text.find("main.go").unwrap() < text.find("todo.txt").unwrap());
        assert_eq!(scratch_dirs_in(dir.path()), 0);
    }

    #[test]
    fn corrupt_seven_zip_replaces_whole_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.7z");
        std::fs::write(&path, b"7z but not really").unwrap();

        let text = document_context(&path, &FileExtractor::default());
        assert!(text.starts_with("\n[Archive Extraction Error: "));
        assert_eq!(scratch_dirs_in(dir.path()), 0);
    }

    #[test]
    fn unsupported_members_contribute_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.zip");
        write_zip(&path, &[("a.py", "x = 1"), ("b.png", "PNG")]);

        let text = document_context(&path, &FileExtractor::default());
        assert!(text.contains("--- File: a.py ---\nx = 1\n"));
        assert!(!text.contains("b.png"));
    }

    #[test]
    fn corrupt_archive_replaces_whole_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"garbage").unwrap();

        let text = document_context(&path, &FileExtractor::default());
        assert!(text.starts_with("\n[Archive Extraction Error: "));
        assert!(text.ends_with("]\n"));
        assert_eq!(scratch_dirs_in(dir.path()), 0);
    }

    #[test]
    fn missing_path_contributes_nothing() {
        let text = document_context(Path::new("/no/such/file.txt"), &FileExtractor::default());
        assert_eq!(text, "");
    }

    #[test]
    fn truncation_counts_characters() {
        let marker = "\n... [Content Truncated] ...";
        assert_eq!(truncate_context("abcdef".into(), 10, marker), "abcdef");
        assert_eq!(truncate_context("abcdef".into(), 6, marker), "abcdef");
        assert_eq!(
            truncate_context("abcdef".into(), 3, marker),
            format!("abc{marker}")
        );
        // multi-byte characters are never split
        assert_eq!(truncate_context("नमस्ते".into(), 2, "|"), "नम|");
    }

    #[test]
    fn large_document_is_cut_at_limit() {
        let text = "x".repeat(25_000);
        let marker = "\n... [Content Truncated] ...";
        let out = truncate_context(text, 20_000, marker);
        assert_eq!(out.chars().count(), 20_000 + marker.chars().count());
        assert!(out.ends_with(marker));
    }
}
