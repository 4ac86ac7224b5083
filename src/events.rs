//! Core record and message types for the file tailing input
//!
//! A `Record` is one newline-delimited unit of content taken from a monitored file.
//! A `Message` is a record together with the metadata attached when it is handed
//! to a sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// One complete line read from a monitored file, without its delimiter
///
/// Content is kept as raw bytes; no character encoding is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record(Vec<u8>);

impl Record {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossy UTF-8 view for display and text sinks
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<&str> for Record {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Syslog facility code (RFC 3164 numbering, 0..=23)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Facility(u8);

impl Facility {
    pub const MAX: u8 = 23;
    /// Facility assigned when neither the monitor nor the config names one
    pub const DEFAULT: Facility = Facility(12);

    /// Returns `None` for codes outside 0..=23
    pub fn new(code: u8) -> Option<Self> {
        (code <= Self::MAX).then_some(Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }
}

impl Default for Facility {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Syslog severity code (RFC 3164 numbering, 0..=7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Severity(u8);

impl Severity {
    pub const MAX: u8 = 7;
    /// Warning
    pub const DEFAULT: Severity = Severity(4);

    /// Returns `None` for codes outside 0..=7
    pub fn new(code: u8) -> Option<Self> {
        (code <= Self::MAX).then_some(Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A record ready for delivery, tagged with its monitor's metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The extracted line
    pub record: Record,
    /// Tag configured for the originating monitor
    pub tag: String,
    pub facility: Facility,
    pub severity: Severity,
    /// Host the record was read on
    pub hostname: String,
    /// When the record was read (not when it was written to the file)
    pub timestamp: Timestamp,
}
