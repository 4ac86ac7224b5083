use crate::checkpoint::{CheckpointRecord, CheckpointStore};
use crate::config::{MonitorDefinition, StartPosition};
use crate::error::{CheckpointError, MonitorError, ReaderError};
use crate::events::{Facility, Record, Severity};
use crate::tail::{FileIdentity, LineExtractor, RotationStatus, StreamReader, StreamState};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Rotation and truncation counts for one monitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorCounters {
    pub rotations: u64,
    pub truncations: u64,
}

/// Tails exactly one file
///
/// Owns the stream reader and line extractor for the file and knows where its
/// checkpoint lives. The lifecycle is `initialize` once, `poll` every pass,
/// `persist` at shutdown (and optionally periodically).
#[derive(Debug)]
pub struct Monitor {
    definition: MonitorDefinition,
    checkpoint_path: PathBuf,
    start_position: StartPosition,
    reader: StreamReader,
    extractor: LineExtractor,
    /// Restored checkpoint not yet applied because the file wasn't there
    pending_restore: Option<CheckpointRecord>,
    counters: MonitorCounters,
}

impl Monitor {
    /// Create a monitor; `checkpoint_path` must already be resolved
    pub fn new(
        definition: MonitorDefinition,
        checkpoint_path: PathBuf,
        start_position: StartPosition,
    ) -> Self {
        Self {
            reader: StreamReader::new(definition.path()),
            extractor: LineExtractor::new(definition.strip_carriage_return()),
            definition,
            checkpoint_path,
            start_position,
            pending_restore: None,
            counters: MonitorCounters::default(),
        }
    }

    /// Restore the checkpoint (if any) and try to open the file
    ///
    /// Never fails: a missing or unreadable checkpoint means starting fresh,
    /// and a missing file is retried by `poll`.
    pub fn initialize(&mut self, remove_checkpoint_after_restore: bool) {
        match CheckpointStore::load(&self.checkpoint_path) {
            Ok(record) => {
                info!(
                    "Restored checkpoint for {}: offset {}",
                    self.path().display(),
                    record.offset
                );
                if remove_checkpoint_after_restore {
                    if let Err(e) = CheckpointStore::remove(&self.checkpoint_path) {
                        warn!(
                            "Failed to remove restored checkpoint {}: {}",
                            self.checkpoint_path.display(),
                            e
                        );
                    }
                }
                self.pending_restore = Some(record);
            }
            Err(CheckpointError::NotFound(_)) => {
                debug!("Clean startup for {}, no checkpoint found", self.path().display());
            }
            Err(e) => {
                warn!(
                    "Ignoring unusable checkpoint for {}: {}",
                    self.path().display(),
                    e
                );
            }
        }

        match self.open_stream(true) {
            Ok(()) => {}
            Err(ReaderError::FileNotFound(_)) => {
                debug!("{} does not exist yet", self.path().display());
            }
            Err(e) => warn!("Failed to open {}: {}", self.path().display(), e),
        }
    }

    /// Read whatever was appended since the last poll and return the complete lines
    ///
    /// # Errors
    ///
    /// Every I/O failure, including a missing file, is `MonitorError::Transient`;
    /// the monitor stays usable and the next poll retries.
    pub fn poll(&mut self) -> Result<Vec<Record>, MonitorError> {
        if !self.reader.is_open() {
            self.open_stream(false).map_err(|e| self.transient(e))?;
        }

        match self.reader.check_rotation().map_err(|e| self.transient(e))? {
            RotationStatus::Unchanged => {}
            RotationStatus::Rotated => {
                info!(
                    "{} was rotated, reading the new file from the start",
                    self.path().display()
                );
                self.counters.rotations += 1;
                return self.follow_rotation();
            }
            RotationStatus::Truncated => {
                warn!(
                    "{} was truncated, reading from the start",
                    self.path().display()
                );
                self.counters.truncations += 1;
                self.extractor.reset();
                self.reader.reopen_from_start().map_err(|e| self.transient(e))?;
            }
            RotationStatus::Missing => {
                // Lines written before the unlink are still reachable through the handle
                let records = self.read_records();
                info!(
                    "{} disappeared, will retry on the next poll",
                    self.path().display()
                );
                self.reader.close();
                return records;
            }
        }

        self.read_records()
    }

    /// Save the current position to the checkpoint file
    ///
    /// The saved offset excludes any buffered partial line, so a restart
    /// re-reads that line in full.
    pub fn persist(&self) -> Result<(), CheckpointError> {
        let record = match (&self.pending_restore, self.reader.identity()) {
            (Some(restore), _) => restore.clone(),
            (None, Some(identity)) => CheckpointRecord {
                path: self.path().to_path_buf(),
                identity: Some(identity),
                offset: self.committed_offset(),
            },
            (None, None) => {
                debug!(
                    "{} was never opened, nothing to checkpoint",
                    self.path().display()
                );
                return Ok(());
            }
        };

        CheckpointStore::save(&self.checkpoint_path, &record)
    }

    /// Release the file handle
    pub fn close(&mut self) {
        self.reader.close();
    }

    /// Offset of the end of the last complete line handed out
    pub fn committed_offset(&self) -> u64 {
        self.reader
            .offset()
            .saturating_sub(self.extractor.pending_len() as u64)
    }

    /// Offset of the reader, including bytes of a buffered partial line
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    pub fn identity(&self) -> Option<FileIdentity> {
        self.reader.identity()
    }

    pub fn stream_state(&self) -> StreamState {
        self.reader.state()
    }

    pub fn path(&self) -> &Path {
        self.definition.path()
    }

    pub fn tag(&self) -> &str {
        self.definition.tag()
    }

    pub fn facility(&self) -> Facility {
        self.definition.facility()
    }

    pub fn severity(&self) -> Severity {
        self.definition.severity()
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn counters(&self) -> MonitorCounters {
        self.counters
    }

    /// Open the file, choosing the start offset from what is known about it
    ///
    /// `StartPosition::End` only applies to the backlog present at
    /// initialization; a file that first shows up later is read from 0.
    fn open_stream(&mut self, initializing: bool) -> Result<(), ReaderError> {
        let path = self.definition.path();
        let metadata = std::fs::metadata(path).map_err(|e| ReaderError::from_io(path, e))?;
        let current = FileIdentity::from_metadata(&metadata)?;

        let (start, same_stream) = if let Some(restore) = &self.pending_restore {
            match restore.identity {
                Some(saved) if saved != current => {
                    info!(
                        "{} was replaced while stopped ({} -> {}), reading from the start",
                        path.display(),
                        saved,
                        current
                    );
                    (0, false)
                }
                _ => (restore.offset, false),
            }
        } else if let Some(previous) = self.reader.identity() {
            // Reopening after a read error or a disappearance
            if previous == current {
                (self.reader.offset(), true)
            } else {
                (0, false)
            }
        } else {
            match self.start_position {
                StartPosition::End if initializing => (metadata.len(), false),
                StartPosition::End | StartPosition::Beginning => (0, false),
            }
        };

        let opened_at = self.reader.open(start)?;
        self.pending_restore = None;
        if !same_stream || opened_at != start {
            self.extractor.reset();
        }
        Ok(())
    }

    /// Finish the old file through its handle, then switch to the new one
    ///
    /// Complete lines appended before the rename are kept; only the trailing
    /// fragment of the old file is discarded.
    fn follow_rotation(&mut self) -> Result<Vec<Record>, MonitorError> {
        let mut records = match self.read_records() {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to drain rotated file: {}", e);
                Vec::new()
            }
        };
        self.extractor.reset();

        // Lines already drained must not be lost to an error on the new file
        let fresh = self
            .reader
            .reopen_from_start()
            .map_err(|e| self.transient(e))
            .and_then(|_| self.read_records());
        match fresh {
            Ok(fresh) => records.extend(fresh),
            Err(e) if records.is_empty() => return Err(e),
            Err(e) => warn!("{}; retrying on the next poll", e),
        }
        Ok(records)
    }

    fn read_records(&mut self) -> Result<Vec<Record>, MonitorError> {
        let bytes = self.reader.read_available().map_err(|e| self.transient(e))?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Read {} bytes from {}", bytes.len(), self.path().display());
        self.extractor.feed(&bytes);
        Ok(self.extractor.drain().collect())
    }

    fn transient(&self, source: ReaderError) -> MonitorError {
        MonitorError::Transient {
            path: self.path().to_path_buf(),
            source,
        }
    }
}
