/// Error types for the file tailing input
pub mod error;

/// Records, messages and syslog metadata
pub mod events;

/// Configuration management
pub mod config;

/// Stream reader, file identity and line extraction
pub mod tail;

/// Persisted read positions
pub mod checkpoint;

/// Monitors and the bounded registry
pub mod monitor;

/// Message sinks
pub mod sink;

/// Poll loop counters
pub mod stats;

/// Poll scheduler and cooperative shutdown
pub mod scheduler;

/// Host lifecycle hooks
pub mod input;

// Re-export commonly used types
pub use config::{Config, MonitorDefinition, StartPosition};
pub use error::{CheckpointError, ConfigError, MonitorError, ReaderError, RegistryError, SinkError};
pub use input::FileInput;
pub use scheduler::{Scheduler, SchedulerSettings, ShutdownHandle};
