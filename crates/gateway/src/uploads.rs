//! Upload directory: storing, listing and deleting user files.
//!
//! Files live flat in one directory. Clients only ever refer to them by bare
//! file name; anything containing a path separator or `..` is rejected.

use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac", "ogg"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub name: String,
    /// e.g. `"12.5 KB"`
    pub size: String,
    /// Local modification time, e.g. `"05 Mar, 14:20"`
    pub date: String,
}

/// Uploads grouped the way the file explorer shows them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileListing {
    pub images: Vec<FileInfo>,
    pub documents: Vec<FileInfo>,
    pub audio: Vec<FileInfo>,
}

#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Use `root`, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an uploaded image as `img_{uuid}{ext}`, keeping the original extension.
    pub async fn save_image(&self, original_name: Option<&str>, bytes: &[u8]) -> io::Result<PathBuf> {
        let ext = original_name
            .and_then(|n| Path::new(n).extension())
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| ".jpg".into());
        let path = self
            .root
            .join(format!("img_{}{ext}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Image upload stored");
        Ok(path)
    }

    /// Store an uploaded document as `doc_{uuid}_{name}`.
    pub async fn save_document(&self, original_name: Option<&str>, bytes: &[u8]) -> io::Result<PathBuf> {
        let name = original_name
            .and_then(|n| Path::new(n).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".into());
        let path = self
            .root
            .join(format!("doc_{}_{name}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Document upload stored");
        Ok(path)
    }

    /// Full path for a client-supplied file name, if the name is acceptable.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        is_safe_name(name).then(|| self.root.join(name))
    }

    /// Remove one upload. `Ok(false)` if there was nothing to remove.
    pub async fn delete(&self, name: &str) -> io::Result<bool> {
        let Some(path) = self.resolve(name) else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every regular file, grouped by type and sorted by name.
    pub async fn list(&self) -> io::Result<FileListing> {
        let mut listing = FileListing::default();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(listing),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let date = meta
                .modified()
                .map(|t| {
                    chrono::DateTime::<chrono::Local>::from(t)
                        .format("%d %b, %H:%M")
                        .to_string()
                })
                .unwrap_or_default();
            let info = FileInfo {
                size: format!("{:.1} KB", meta.len() as f64 / 1024.0),
                date,
                name,
            };

            let ext = Path::new(&info.name)
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                listing.images.push(info);
            } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
                listing.audio.push(info);
            } else {
                listing.documents.push(info);
            }
        }

        for group in [&mut listing.images, &mut listing.documents, &mut listing.audio] {
            group.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(listing)
    }
}

/// A bare file name: exactly one normal path component and no separators.
pub fn is_safe_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
