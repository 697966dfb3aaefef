//! Archive unpacking for zip and 7z uploads.

use std::fs::File;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    SevenZip,
}

impl ArchiveKind {
    /// Classify by extension, case-insensitively.
    pub fn of(path: &Path) -> Option<Self> {
        match super::extension(path).as_deref() {
            Some("zip") => Some(Self::Zip),
            Some("7z") => Some(Self::SevenZip),
            _ => None,
        }
    }
}

/// Unpack `archive` beneath `dest`, choosing the format by extension.
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let kind = ArchiveKind::of(archive).ok_or_else(|| {
        ExtractError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("unsupported archive format: {}", super::display_name(archive)),
        ))
    })?;
    unpack(archive, kind, dest)
}

/// Unpack every member of `archive` beneath `dest`.
///
/// Zip member paths that would escape `dest` are rejected by the zip reader.
fn unpack(archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<(), ExtractError> {
    match kind {
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
            zip.extract(dest)?;
        }
        ArchiveKind::SevenZip => {
            sevenz_rust::decompress_file(archive, dest)
                .map_err(|e| ExtractError::SevenZip(e.to_string()))?;
        }
    }
    Ok(())
}

/// Regular files beneath `root`, depth-first with each directory's entries
/// sorted by file name.
pub fn member_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn kind_by_extension() {
        assert_eq!(ArchiveKind::of(Path::new("a.zip")), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::of(Path::new("A.ZIP")), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::of(Path::new("b.7z")), Some(ArchiveKind::SevenZip));
        assert_eq!(ArchiveKind::of(Path::new("c.tar")), None);
        assert_eq!(ArchiveKind::of(Path::new("noext")), None);
    }

    #[test]
    fn unpack_zip_and_walk_members() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        write_zip(&archive, &[("b.txt", "second"), ("src/a.py", "print(1)")]);

        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        unpack(&archive, ArchiveKind::Zip, &dest).unwrap();

        let names: Vec<String> = member_files(&dest)
            .iter()
            .map(|p| p.strip_prefix(&dest).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["b.txt", "src/a.py"]);
    }

    #[test]
    fn unpack_corrupt_zip_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"this is not a zip").unwrap();

        let result = unpack(&archive, ArchiveKind::Zip, dir.path());
        assert!(matches!(result, Err(ExtractError::Zip(_))));
    }

    #[test]
    fn unpack_archive_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let result = unpack_archive(&dir.path().join("x.rar"), dir.path());
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }

    #[test]
    fn member_files_of_missing_dir_is_empty() {
        assert!(member_files(Path::new("/definitely/not/here")).is_empty());
    }
}
