//! File identity tokens used to tell growth and truncation apart from replacement.

use serde::{Deserialize, Serialize};
use std::fs::{File, Metadata};
use std::io;
use std::path::Path;

/// A comparable token naming one underlying file.
///
/// On Unix this is the device ID + inode number. Elsewhere the creation time
/// stands in for the inode. The token is stable for the lifetime of one file
/// and differs once the path is replaced by a new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    /// Build an identity from raw values (used when loading checkpoints)
    pub fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        Ok(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        let created = metadata
            .created()?
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(Self {
            dev: created.as_secs(),
            ino: u64::from(created.subsec_nanos()),
        })
    }

    pub fn from_file(file: &File) -> io::Result<Self> {
        Self::from_metadata(&file.metadata()?)
    }

    /// Identity of whatever the path currently resolves to (symlinks followed)
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::from_metadata(&std::fs::metadata(path)?)
    }

    pub fn dev(&self) -> u64 {
        self.dev
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }
}

impl std::fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_identity_same_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"content").unwrap();

        let id1 = FileIdentity::from_path(file.path()).unwrap();
        let id2 = FileIdentity::from_file(&file.reopen().unwrap()).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_identity_stable_across_append() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"first").unwrap();
        let before = FileIdentity::from_path(file.path()).unwrap();

        file.write_all(b" second").unwrap();
        file.flush().unwrap();
        let after = FileIdentity::from_path(file.path()).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    #[cfg(unix)]
    fn test_identity_changes_on_replace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"old").unwrap();
        let old = FileIdentity::from_path(&path).unwrap();

        // Keep the old inode alive so it can't be reused for the replacement
        let rotated = dir.path().join("app.log.1");
        std::fs::rename(&path, &rotated).unwrap();
        std::fs::write(&path, b"new").unwrap();
        let new = FileIdentity::from_path(&path).unwrap();

        assert_ne!(old, new);
    }

    #[test]
    fn test_identity_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = FileIdentity::from_path(dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(FileIdentity::new(8, 1234).to_string(), "8:1234");
    }
}
