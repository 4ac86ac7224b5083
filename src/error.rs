use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a stream reader while opening or reading a monitored file
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    /// Map an `io::Error` on `path`, separating "not there" from other failures
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ReaderError::FileNotFound(path.to_path_buf())
        } else {
            ReaderError::Io(err)
        }
    }
}

/// Errors raised while loading or saving checkpoint files
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint not found: {0}")]
    NotFound(PathBuf),

    #[error("Corrupt checkpoint {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Unsupported checkpoint version {version} in {path}")]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a single monitor poll
///
/// Neither variant stops the poll loop; the distinction only affects how loudly
/// the scheduler logs the failure.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Transient error on {path}: {source}")]
    Transient {
        path: PathBuf,
        #[source]
        source: ReaderError,
    },

    #[error("Fatal error on {path}: {reason}")]
    Fatal { path: PathBuf, reason: String },
}

/// Errors returned by the monitor registry
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Too many file monitors configured (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("Checkpoint {path} is already used by the monitor for {owner}")]
    DuplicateCheckpoint { path: PathBuf, owner: PathBuf },
}

/// Errors returned by a message sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Sink disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Errors that make the input refuse to run
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("No files configured to be monitored")]
    NoMonitors,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
