use crate::events::{Facility, Severity};
use std::path::{Path, PathBuf};

/// Everything needed to register one monitor
///
/// Built explicitly and handed to `MonitorRegistry::register`, so nothing
/// carries over from one registration to the next.
///
/// # Example
///
/// ```
/// use filetail::config::MonitorDefinition;
///
/// let definition = MonitorDefinition::new("/var/log/app.log")
///     .with_tag("app:")
///     .with_checkpoint_path("app.state");
/// assert_eq!(definition.tag(), "app:");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorDefinition {
    path: PathBuf,
    tag: String,
    checkpoint_path: Option<PathBuf>,
    facility: Facility,
    severity: Severity,
    strip_carriage_return: bool,
}

impl MonitorDefinition {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tag: String::new(),
            checkpoint_path: None,
            facility: Facility::default(),
            severity: Severity::default(),
            strip_carriage_return: false,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Relative paths are resolved against the work directory at registration
    pub fn with_checkpoint_path(mut self, checkpoint_path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(checkpoint_path.into());
        self
    }

    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facility = facility;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_strip_carriage_return(mut self, strip: bool) -> Self {
        self.strip_carriage_return = strip;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn strip_carriage_return(&self) -> bool {
        self.strip_carriage_return
    }

    /// Where this monitor's checkpoint lives
    ///
    /// Absolute checkpoint paths are used as given; relative ones are joined to
    /// `work_dir`. Without an explicit path, a file name is derived from the
    /// monitored path.
    pub fn resolve_checkpoint_path(&self, work_dir: &Path) -> PathBuf {
        match &self.checkpoint_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => work_dir.join(path),
            None => work_dir.join(derived_checkpoint_name(&self.path)),
        }
    }
}

/// Flatten `path` into a single file name
///
/// `/` becomes `_`; `_`, `%` and the other separators are percent-escaped so
/// distinct paths never map to the same name.
fn derived_checkpoint_name(path: &Path) -> String {
    let mut flattened = String::new();
    for c in path.to_string_lossy().trim_start_matches('/').chars() {
        match c {
            '/' => flattened.push('_'),
            '_' => flattened.push_str("%5F"),
            '%' => flattened.push_str("%25"),
            '\\' => flattened.push_str("%5C"),
            ':' => flattened.push_str("%3A"),
            c => flattened.push(c),
        }
    }
    format!("{}.state", flattened)
}
