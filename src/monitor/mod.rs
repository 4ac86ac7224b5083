/// Per-file tailing state and checkpoint hooks
#[allow(clippy::module_inception)]
pub mod monitor;

/// Capacity-bounded monitor collection
pub mod registry;

pub use monitor::{Monitor, MonitorCounters};
pub use registry::MonitorRegistry;
