//! Crash-safe persistence of monitor read positions.
//!
//! Each monitor owns one checkpoint file holding a versioned JSON document.
//! Writes go to a temporary sibling that is flushed and then renamed over the
//! target, so a crash mid-write leaves the previous checkpoint intact.

use crate::error::CheckpointError;
use crate::tail::FileIdentity;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Current on-disk schema version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Read position of one monitored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    /// Monitored path at the time of saving
    pub path: PathBuf,
    /// Identity of the file the offset refers to, if it was ever opened
    pub identity: Option<FileIdentity>,
    /// Bytes already delivered from that file
    pub offset: u64,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct PersistedCheckpointV1 {
    version: u32,
    path: PathBuf,
    identity: Option<FileIdentity>,
    offset: u64,
}

/// Stateless service that reads and writes checkpoint files
pub struct CheckpointStore;

impl CheckpointStore {
    /// Write `record` to `checkpoint_path`, replacing any previous checkpoint atomically
    pub fn save(checkpoint_path: &Path, record: &CheckpointRecord) -> Result<(), CheckpointError> {
        let persisted = PersistedCheckpointV1 {
            version: CHECKPOINT_VERSION,
            path: record.path.clone(),
            identity: record.identity,
            offset: record.offset,
        };

        atomic_write(checkpoint_path, &persisted)?;

        debug!(
            "Saved checkpoint {} (offset {})",
            checkpoint_path.display(),
            record.offset
        );
        Ok(())
    }

    /// Read the checkpoint at `checkpoint_path`
    ///
    /// # Errors
    ///
    /// * `CheckpointError::NotFound` - no checkpoint yet (first run)
    /// * `CheckpointError::Corrupt` - the file exists but cannot be parsed
    /// * `CheckpointError::UnsupportedVersion` - written by an incompatible version
    /// * `CheckpointError::Io` - any other read failure
    pub fn load(checkpoint_path: &Path) -> Result<CheckpointRecord, CheckpointError> {
        let bytes = match fs::read(checkpoint_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckpointError::NotFound(checkpoint_path.to_path_buf()))
            }
            Err(e) => return Err(CheckpointError::Io(e)),
        };

        let corrupt = |e: serde_json::Error| CheckpointError::Corrupt {
            path: checkpoint_path.to_path_buf(),
            reason: e.to_string(),
        };

        let header: VersionHeader = serde_json::from_slice(&bytes).map_err(corrupt)?;
        if header.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                path: checkpoint_path.to_path_buf(),
                version: header.version,
            });
        }

        let persisted: PersistedCheckpointV1 = serde_json::from_slice(&bytes).map_err(corrupt)?;
        Ok(CheckpointRecord {
            path: persisted.path,
            identity: persisted.identity,
            offset: persisted.offset,
        })
    }

    /// Delete the checkpoint file; a missing file is not an error
    pub fn remove(checkpoint_path: &Path) -> Result<(), CheckpointError> {
        match fs::remove_file(checkpoint_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckpointError::Io(e)),
        }
    }
}

fn atomic_write<T: Serialize>(path: &Path, value: &T) -> Result<(), CheckpointError> {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let unique_id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(format!(".tmp.{}.{}", std::process::id(), unique_id));
    let temp_path = PathBuf::from(temp_name);

    let result = write_and_sync(&temp_path, value).and_then(|()| {
        fs::rename(&temp_path, path)?;
        Ok(())
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
        return result;
    }

    // The rename itself is only durable once the directory entry is synced
    if let Err(e) = sync_parent(path) {
        warn!(
            "Failed to sync directory of checkpoint {}: {}",
            path.display(),
            e
        );
    }
    result
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn write_and_sync<T: Serialize>(temp_path: &Path, value: &T) -> Result<(), CheckpointError> {
    let file = File::create(temp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(io::Error::from)?;
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}
