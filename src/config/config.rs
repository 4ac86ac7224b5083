use crate::config::MonitorDefinition;
use crate::error::ConfigError;
use crate::events::{Facility, Severity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where to start reading a file that has no usable checkpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    /// Replay the existing backlog from offset 0
    #[default]
    Beginning,
    /// Skip the backlog and only forward lines written from now on
    End,
}

/// Top-level configuration, loaded from TOML
///
/// ```toml
/// poll_interval_seconds = 10
/// max_monitors = 100
/// work_dir = "/var/lib/filetail"
///
/// [[monitor]]
/// path = "/var/log/app.log"
/// tag = "app:"
/// checkpoint = "app.state"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seconds to wait between passes
    pub poll_interval_seconds: u64,
    /// Upper bound on registered monitors
    pub max_monitors: usize,
    /// Base directory for relative checkpoint paths
    pub work_dir: PathBuf,
    /// Start position for files without a checkpoint
    pub start_position: StartPosition,
    /// Persist all monitors after every N passes (0 = only at shutdown)
    pub checkpoint_every_passes: u32,
    /// Delete a checkpoint file once it has been restored
    pub remove_checkpoint_after_restore: bool,
    /// Facility for monitors that don't set one
    pub default_facility: u8,
    /// Severity for monitors that don't set one
    pub default_severity: u8,
    /// Files to monitor
    #[serde(rename = "monitor")]
    pub monitors: Vec<MonitorConfig>,
}

/// One `[[monitor]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
    #[serde(default)]
    pub facility: Option<u8>,
    #[serde(default)]
    pub severity: Option<u8>,
    #[serde(default)]
    pub strip_carriage_return: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 10,
            max_monitors: 100,
            work_dir: PathBuf::from("."),
            start_position: StartPosition::default(),
            checkpoint_every_passes: 0,
            remove_checkpoint_after_restore: true,
            default_facility: Facility::DEFAULT.code(),
            default_severity: Severity::DEFAULT.code(),
            monitors: Vec::new(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// `ConfigError::ReadError` if the file cannot be read, `ConfigError::TomlError`
    /// for syntax errors and `ConfigError::ValidationError` for bad values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_monitors == 0 {
            return Err(ConfigError::ValidationError(
                "max_monitors must be at least 1".to_string(),
            ));
        }

        check_facility(self.default_facility, "default_facility")?;
        check_severity(self.default_severity, "default_severity")?;

        for monitor in &self.monitors {
            if monitor.path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(
                    "monitor path must not be empty".to_string(),
                ));
            }
            if !monitor.path.is_absolute() {
                return Err(ConfigError::ValidationError(format!(
                    "monitor path must be absolute: {}",
                    monitor.path.display()
                )));
            }
            if let Some(facility) = monitor.facility {
                check_facility(facility, "facility")?;
            }
            if let Some(severity) = monitor.severity {
                check_severity(severity, "severity")?;
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn default_facility(&self) -> Facility {
        Facility::new(self.default_facility).unwrap_or_default()
    }

    pub fn default_severity(&self) -> Severity {
        Severity::new(self.default_severity).unwrap_or_default()
    }

    /// Turn the `[[monitor]]` tables into definitions, filling in defaults
    pub fn monitor_definitions(&self) -> Vec<MonitorDefinition> {
        self.monitors
            .iter()
            .map(|monitor| {
                let facility = monitor
                    .facility
                    .and_then(Facility::new)
                    .unwrap_or_else(|| self.default_facility());
                let severity = monitor
                    .severity
                    .and_then(Severity::new)
                    .unwrap_or_else(|| self.default_severity());

                let mut definition = MonitorDefinition::new(&monitor.path)
                    .with_tag(&monitor.tag)
                    .with_facility(facility)
                    .with_severity(severity)
                    .with_strip_carriage_return(monitor.strip_carriage_return);
                if let Some(checkpoint) = &monitor.checkpoint {
                    definition = definition.with_checkpoint_path(checkpoint);
                }
                definition
            })
            .collect()
    }
}

fn check_facility(code: u8, field: &str) -> Result<(), ConfigError> {
    if Facility::new(code).is_none() {
        return Err(ConfigError::ValidationError(format!(
            "{} must be between 0 and {}, got {}",
            field,
            Facility::MAX,
            code
        )));
    }
    Ok(())
}

fn check_severity(code: u8, field: &str) -> Result<(), ConfigError> {
    if Severity::new(code).is_none() {
        return Err(ConfigError::ValidationError(format!(
            "{} must be between 0 and {}, got {}",
            field,
            Severity::MAX,
            code
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.max_monitors, 100);
        assert_eq!(config.default_facility().code(), 12);
        assert_eq!(config.default_severity().code(), 4);
        assert_eq!(config.start_position, StartPosition::Beginning);
        assert!(config.remove_checkpoint_after_restore);
        assert!(config.monitors.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            poll_interval_seconds = 2
            max_monitors = 5
            work_dir = "/var/lib/filetail"
            start_position = "end"
            checkpoint_every_passes = 30
            remove_checkpoint_after_restore = false
            default_facility = 16
            default_severity = 6

            [[monitor]]
            path = "/var/log/app.log"
            tag = "app:"
            checkpoint = "app.state"
            severity = 3

            [[monitor]]
            path = "/var/log/other.log"
            strip_carriage_return = true
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.poll_interval_seconds, 2);
        assert_eq!(config.start_position, StartPosition::End);
        assert_eq!(config.checkpoint_every_passes, 30);
        assert!(!config.remove_checkpoint_after_restore);

        let defs = config.monitor_definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].tag(), "app:");
        assert_eq!(defs[0].facility().code(), 16);
        assert_eq!(defs[0].severity().code(), 3);
        assert_eq!(
            defs[0].resolve_checkpoint_path(&config.work_dir),
            PathBuf::from("/var/lib/filetail/app.state")
        );
        assert_eq!(defs[1].severity().code(), 6);
        assert!(defs[1].strip_carriage_return());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml_str("poll_interval_seconds = 1").unwrap();
        assert_eq!(config.max_monitors, 100);
        assert_eq!(config.default_severity, 4);
    }

    #[test]
    fn test_rejects_out_of_range_facility() {
        let result = Config::from_toml_str("default_facility = 24");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let result = Config::from_toml_str(
            r#"
            [[monitor]]
            path = "/var/log/a.log"
            severity = 8
        "#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_relative_monitor_path() {
        let result = Config::from_toml_str(
            r#"
            [[monitor]]
            path = "relative.log"
        "#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = Config::from_toml_str("max_monitors = 0");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = Config::from_toml_str("poll_intervall = 3");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_monitors = 7").unwrap();
        file.flush().unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.max_monitors, 7);
    }

    #[test]
    fn test_from_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/filetail.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
