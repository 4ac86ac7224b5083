use crate::error::ReaderError;
use crate::tail::identity::FileIdentity;
use log::{debug, warn};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Lifecycle of the handle owned by a [`StreamReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No handle; the next poll will try to open the file
    Closed,
    /// Handle open and positioned at the current offset
    Open,
    /// The last read failed; the handle is reopened on the next poll
    Error,
}

/// Result of comparing the open handle against what the path resolves to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStatus {
    /// Same file, same or larger size
    Unchanged,
    /// The path now names a different file
    Rotated,
    /// Same file, but it is now shorter than what was already consumed
    Truncated,
    /// The path does not resolve to anything
    Missing,
}

/// Owns the open handle, read offset and identity for one monitored file
///
/// Reads never wait for data: when the file has not grown, `read_available`
/// returns an empty buffer immediately.
#[derive(Debug)]
pub struct StreamReader {
    path: PathBuf,
    file: Option<File>,
    identity: Option<FileIdentity>,
    /// Bytes consumed from the current file identity
    offset: u64,
    state: StreamState,
}

impl StreamReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
            identity: None,
            offset: 0,
            state: StreamState::Closed,
        }
    }

    /// Open the file and position the handle at `start_offset`
    ///
    /// An offset past the end of the file means the file was replaced by
    /// something shorter, so reading starts over at 0. Returns the offset the
    /// handle was actually positioned at.
    ///
    /// # Errors
    ///
    /// `ReaderError::FileNotFound` if the path does not exist, `ReaderError::Io`
    /// for any other failure.
    pub fn open(&mut self, start_offset: u64) -> Result<u64, ReaderError> {
        self.close();

        let mut file = File::open(&self.path).map_err(|e| ReaderError::from_io(&self.path, e))?;
        let metadata = file.metadata()?;
        let identity = FileIdentity::from_metadata(&metadata)?;
        let size = metadata.len();

        let offset = if start_offset > size {
            warn!(
                "{} is shorter than the requested offset ({} < {}), reading from the start",
                self.path.display(),
                size,
                start_offset
            );
            0
        } else {
            start_offset
        };

        file.seek(SeekFrom::Start(offset))?;

        debug!(
            "Opened {} (identity {}) at offset {} of {}",
            self.path.display(),
            identity,
            offset,
            size
        );

        self.file = Some(file);
        self.identity = Some(identity);
        self.offset = offset;
        self.state = StreamState::Open;
        Ok(offset)
    }

    /// Close the handle and open the path again from offset 0
    pub fn reopen_from_start(&mut self) -> Result<u64, ReaderError> {
        self.open(0)
    }

    /// Read everything between the current offset and the end of the file
    ///
    /// Advances the offset by the number of bytes returned. Being at the end
    /// of the file is not an error; the result is simply empty.
    pub fn read_available(&mut self) -> Result<Vec<u8>, ReaderError> {
        let file = match self.file.as_mut() {
            Some(file) if self.state == StreamState::Open => file,
            _ => {
                return Err(ReaderError::Io(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "stream is not open",
                )))
            }
        };

        let mut buf = Vec::new();
        let result = file
            .seek(SeekFrom::Start(self.offset))
            .and_then(|_| file.read_to_end(&mut buf));

        match result {
            Ok(n) => {
                self.offset += n as u64;
                Ok(buf)
            }
            Err(e) => {
                self.state = StreamState::Error;
                Err(ReaderError::Io(e))
            }
        }
    }

    /// Compare the open file against what the path resolves to now
    ///
    /// Does not modify the reader; the caller decides how to react.
    pub fn check_rotation(&self) -> Result<RotationStatus, ReaderError> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RotationStatus::Missing),
            Err(e) => return Err(ReaderError::Io(e)),
        };

        let current = FileIdentity::from_metadata(&metadata)?;
        match self.identity {
            Some(identity) if identity != current => Ok(RotationStatus::Rotated),
            Some(_) if metadata.len() < self.offset => Ok(RotationStatus::Truncated),
            Some(_) => Ok(RotationStatus::Unchanged),
            // Never opened: nothing to compare against
            None => Ok(RotationStatus::Unchanged),
        }
    }

    /// Release the handle; offset and identity are kept for checkpointing
    pub fn close(&mut self) {
        self.file = None;
        self.state = StreamState::Closed;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Identity captured at the last successful open
    pub fn identity(&self) -> Option<FileIdentity> {
        self.identity
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == StreamState::Open
    }
}
