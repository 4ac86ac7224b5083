/// File identity tokens for rotation detection
pub mod identity;

/// Non-blocking reader over one growing file
pub mod reader;

/// Newline splitting with partial-line buffering
pub mod extractor;

pub use extractor::{Drain, LineExtractor};
pub use identity::FileIdentity;
pub use reader::{RotationStatus, StreamReader, StreamState};
