use crate::error::RegistryError;
use crate::monitor::Monitor;
use log::{info, warn};

/// Bounded, ordered collection of monitors
///
/// Registration order is poll order. Once `capacity` monitors are registered,
/// further registrations are rejected rather than silently dropped.
#[derive(Debug)]
pub struct MonitorRegistry {
    monitors: Vec<Monitor>,
    capacity: usize,
}

impl MonitorRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            monitors: Vec::new(),
            capacity,
        }
    }

    /// Add a monitor at the end of the poll order
    ///
    /// # Errors
    ///
    /// `RegistryError::CapacityExceeded` when the registry is full and
    /// `RegistryError::DuplicateCheckpoint` when another monitor already saves
    /// to the same checkpoint file. The registry is left unchanged.
    pub fn register(&mut self, monitor: Monitor) -> Result<(), RegistryError> {
        if self.monitors.len() >= self.capacity {
            warn!(
                "Too many file monitors configured - ignoring {}",
                monitor.path().display()
            );
            return Err(RegistryError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        if let Some(owner) = self
            .monitors
            .iter()
            .find(|m| m.checkpoint_path() == monitor.checkpoint_path())
        {
            warn!(
                "Checkpoint {} already belongs to {} - ignoring {}",
                monitor.checkpoint_path().display(),
                owner.path().display(),
                monitor.path().display()
            );
            return Err(RegistryError::DuplicateCheckpoint {
                path: monitor.checkpoint_path().to_path_buf(),
                owner: owner.path().to_path_buf(),
            });
        }

        info!(
            "Registered monitor #{} for {} (tag '{}')",
            self.monitors.len() + 1,
            monitor.path().display(),
            monitor.tag()
        );
        self.monitors.push(monitor);
        Ok(())
    }

    /// Drop every monitor and change the capacity for future registrations
    pub fn reset(&mut self, capacity: usize) {
        self.monitors.clear();
        self.capacity = capacity;
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Monitors in registration order
    pub fn iter(&self) -> std::slice::Iter<'_, Monitor> {
        self.monitors.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Monitor> {
        self.monitors.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonitorDefinition, StartPosition};
    use std::path::PathBuf;

    fn monitor(n: usize) -> Monitor {
        Monitor::new(
            MonitorDefinition::new(format!("/var/log/file{}.log", n)),
            PathBuf::from(format!("/tmp/file{}.state", n)),
            StartPosition::Beginning,
        )
    }

    #[test]
    fn test_capacity_enforced() {
        let mut registry = MonitorRegistry::new(3);
        for n in 0..3 {
            assert!(registry.register(monitor(n)).is_ok());
        }

        assert_eq!(
            registry.register(monitor(3)),
            Err(RegistryError::CapacityExceeded { capacity: 3 })
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_shared_checkpoint_rejected() {
        let mut registry = MonitorRegistry::new(3);
        registry.register(monitor(0)).unwrap();

        let clash = Monitor::new(
            MonitorDefinition::new("/var/log/other.log"),
            PathBuf::from("/tmp/file0.state"),
            StartPosition::Beginning,
        );
        assert_eq!(
            registry.register(clash),
            Err(RegistryError::DuplicateCheckpoint {
                path: PathBuf::from("/tmp/file0.state"),
                owner: PathBuf::from("/var/log/file0.log"),
            })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = MonitorRegistry::new(10);
        for n in 0..5 {
            registry.register(monitor(n)).unwrap();
        }

        let paths: Vec<PathBuf> = registry.iter().map(|m| m.path().to_path_buf()).collect();
        let expected: Vec<PathBuf> = (0..5)
            .map(|n| PathBuf::from(format!("/var/log/file{}.log", n)))
            .collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_reset_clears_and_resizes() {
        let mut registry = MonitorRegistry::new(1);
        registry.register(monitor(0)).unwrap();
        assert!(registry.register(monitor(1)).is_err());

        registry.reset(2);
        assert!(registry.is_empty());
        assert_eq!(registry.capacity(), 2);
        assert!(registry.register(monitor(1)).is_ok());
        assert!(registry.register(monitor(2)).is_ok());
    }
}
