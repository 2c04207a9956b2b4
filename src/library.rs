use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::PanelError;

/// Flat directory of media files the operator keeps on the server, mirrored to
/// the device on upload.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    dir: PathBuf,
}

/// Accepts a plain file name only: no separators, no parent references.
pub fn validate_name(name: &str) -> Result<&str, PanelError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PanelError::invalid("file name is empty"));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name && !name.contains('\\') => Ok(name),
        _ => Err(PanelError::invalid(format!("invalid file name: {:?}", name))),
    }
}

impl MediaLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, PanelError> {
        Ok(self.dir.join(validate_name(name)?))
    }

    /// File names in the library, sorted. A library directory that does not exist
    /// yet is empty.
    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn save(&self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let path = self.path_of(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, bytes).await?;
        log::info!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Returns whether a file was removed.
    pub async fn delete(&self, name: &str) -> anyhow::Result<bool> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn contains(&self, name: &str) -> anyhow::Result<bool> {
        let path = self.path_of(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
