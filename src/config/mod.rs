/// TOML configuration file
#[allow(clippy::module_inception)]
pub mod config;

/// Per-monitor registration builder
pub mod definition;

pub use config::{Config, MonitorConfig, StartPosition};
pub use definition::MonitorDefinition;
