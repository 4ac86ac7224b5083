//! Lifecycle entry points for hosting the file input
//!
//! [`FileInput`] ties together the registry, the scheduler and a sink and
//! exposes the hooks a host process drives: register monitors, check
//! `will_run`, block in `run`, request `shutdown` from another thread, and
//! finally `cleanup`.

use crate::config::{Config, MonitorDefinition};
use crate::error::{RegistryError, StartupError};
use crate::monitor::{Monitor, MonitorRegistry};
use crate::scheduler::{Scheduler, SchedulerSettings, ShutdownHandle};
use crate::sink::MessageSink;
use crate::stats::TailStats;
use log::{debug, error, info, warn};

/// Tails every configured file and forwards its lines to a sink
pub struct FileInput {
    /// Scalar settings (poll interval, work dir, defaults)
    config: Config,
    registry: MonitorRegistry,
    scheduler: Scheduler,
    sink: Box<dyn MessageSink>,
}

impl FileInput {
    /// Create an input and register every monitor listed in `config`
    ///
    /// Monitors beyond `max_monitors`, or sharing a checkpoint file with an
    /// earlier monitor, are rejected with a warning; the rest are kept.
    pub fn new(config: Config, sink: Box<dyn MessageSink>) -> Self {
        let scheduler = Scheduler::new(SchedulerSettings::from_config(&config));
        Self::with_scheduler(config, sink, scheduler)
    }

    /// Like `new`, with a caller-supplied scheduler (fixed host name in tests)
    pub fn with_scheduler(config: Config, sink: Box<dyn MessageSink>, scheduler: Scheduler) -> Self {
        let definitions = config.monitor_definitions();
        let mut input = Self {
            registry: MonitorRegistry::new(config.max_monitors),
            config,
            scheduler,
            sink,
        };

        let mut rejected = 0;
        for definition in definitions {
            if let Err(e) = input.register_monitor(definition) {
                debug!("Monitor from configuration not registered: {}", e);
                rejected += 1;
            }
        }
        if rejected > 0 {
            warn!(
                "{} configured monitor(s) were not registered, {} active",
                rejected,
                input.registry.len()
            );
        }

        input
    }

    /// Add a monitor for one file
    ///
    /// # Errors
    ///
    /// `RegistryError::CapacityExceeded` once `max_monitors` monitors exist,
    /// `RegistryError::DuplicateCheckpoint` if the resolved checkpoint file is
    /// already used by another monitor.
    pub fn register_monitor(&mut self, definition: MonitorDefinition) -> Result<(), RegistryError> {
        let checkpoint_path = definition.resolve_checkpoint_path(&self.config.work_dir);
        let monitor = Monitor::new(definition, checkpoint_path, self.config.start_position);
        self.registry.register(monitor)
    }

    /// Forget every monitor and return all scalar settings to their defaults
    pub fn reset_all(&mut self) {
        self.config = Config::default();
        self.registry.reset(self.config.max_monitors);
        self.scheduler
            .set_settings(SchedulerSettings::from_config(&self.config));
        info!("Configuration reset to defaults");
    }

    /// Whether there is anything to do; logs why not
    pub fn will_run(&self) -> bool {
        if self.registry.is_empty() {
            error!("No files configured to be monitored");
            return false;
        }
        true
    }

    /// Run the poll loop until `shutdown` is requested
    ///
    /// Restores checkpoints first and persists every monitor before returning.
    ///
    /// # Errors
    ///
    /// `StartupError::NoMonitors` if nothing is registered,
    /// `StartupError::Config` if the settings fail validation.
    pub fn run(&mut self) -> Result<(), StartupError> {
        if !self.will_run() {
            return Err(StartupError::NoMonitors);
        }
        self.config.validate()?;

        self.scheduler
            .set_settings(SchedulerSettings::from_config(&self.config));
        self.scheduler.run(&mut self.registry, self.sink.as_mut());
        Ok(())
    }

    /// Handle for requesting shutdown from another thread or a signal handler
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.scheduler.shutdown_handle()
    }

    /// Request cancellation; `run` persists state and returns after the current pass
    pub fn shutdown(&self) {
        self.scheduler.shutdown_handle().shutdown();
    }

    /// Close every file handle and flush the sink
    pub fn cleanup(&mut self) {
        for monitor in self.registry.iter_mut() {
            monitor.close();
        }
        if let Err(e) = self.sink.flush() {
            warn!("Failed to flush message sink during cleanup: {}", e);
        }
        info!("File input cleaned up");
    }

    pub fn registry(&self) -> &MonitorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &TailStats {
        self.scheduler.stats()
    }
}
