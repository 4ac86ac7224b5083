use crate::config::Config;
use crate::error::{MonitorError, ReaderError};
use crate::events::Message;
use crate::monitor::{Monitor, MonitorRegistry};
use crate::sink::MessageSink;
use crate::stats::TailStats;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Shortest wait between passes, even with a zero poll interval
const MIN_SUSPEND: Duration = Duration::from_nanos(10);

/// Loop settings taken from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub poll_interval: Duration,
    /// Persist every monitor after this many passes (0 = only at shutdown)
    pub checkpoint_every_passes: u32,
    pub remove_checkpoint_after_restore: bool,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            checkpoint_every_passes: config.checkpoint_every_passes,
            remove_checkpoint_after_restore: config.remove_checkpoint_after_restore,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Requests cooperative cancellation of a running scheduler
///
/// Cloneable and `Send`, so it can be handed to a signal handler.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl ShutdownHandle {
    /// Ask the scheduler to stop after the current pass
    pub fn shutdown(&self) {
        if self.sender.send(()).is_err() {
            debug!("Scheduler already gone, shutdown request ignored");
        }
    }
}

/// Drives every monitor once per pass and forwards the records to a sink
///
/// Monitors are polled sequentially in registration order. Between passes the
/// scheduler waits on its shutdown channel for the poll interval; that wait is
/// the only place cancellation is observed, so a pass is never abandoned
/// half way.
pub struct Scheduler {
    settings: SchedulerSettings,
    hostname: String,
    shutdown_sender: Sender<()>,
    shutdown_receiver: Receiver<()>,
    stats: TailStats,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self::with_hostname(settings, local_hostname())
    }

    /// Create a scheduler that stamps messages with `hostname`
    pub fn with_hostname(settings: SchedulerSettings, hostname: String) -> Self {
        let (shutdown_sender, shutdown_receiver) = mpsc::channel();
        Self {
            settings,
            hostname,
            shutdown_sender,
            shutdown_receiver,
            stats: TailStats::new(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: self.shutdown_sender.clone(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    /// Replace the loop settings; takes effect at the next `run`
    pub fn set_settings(&mut self, settings: SchedulerSettings) {
        self.settings = settings;
    }

    pub fn stats(&self) -> &TailStats {
        &self.stats
    }

    /// Restore checkpoints, poll until cancelled, then persist every monitor
    pub fn run(&mut self, registry: &mut MonitorRegistry, sink: &mut dyn MessageSink) {
        info!(
            "Starting poll loop over {} monitor(s), interval {:?}",
            registry.len(),
            self.settings.poll_interval
        );

        self.initialize_all(registry);

        loop {
            match self.shutdown_receiver.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            self.run_pass(registry, sink);

            let every = self.settings.checkpoint_every_passes;
            if every > 0 && self.stats.passes % u64::from(every) == 0 {
                debug!("Periodic checkpoint after pass {}", self.stats.passes);
                self.persist_all(registry);
            }

            if self.wait_for_next_pass() {
                break;
            }
        }

        info!("Poll loop cancelled, persisting monitor state");
        self.persist_all(registry);
        self.stats.log_summary();
    }

    /// Restore each monitor's checkpoint and open its file
    pub fn initialize_all(&mut self, registry: &mut MonitorRegistry) {
        let remove = self.settings.remove_checkpoint_after_restore;
        for monitor in registry.iter_mut() {
            monitor.initialize(remove);
        }
    }

    /// Poll every monitor once and forward what they produced
    pub fn run_pass(&mut self, registry: &mut MonitorRegistry, sink: &mut dyn MessageSink) {
        for monitor in registry.iter_mut() {
            self.poll_monitor(monitor, sink);
        }

        if let Err(e) = sink.flush() {
            warn!("Failed to flush message sink: {}", e);
        }

        self.stats.passes += 1;
    }

    /// Persist every monitor, continuing past failures
    ///
    /// Returns the number of monitors whose checkpoint could not be written.
    pub fn persist_all(&mut self, registry: &MonitorRegistry) -> usize {
        let mut failures = 0;
        for monitor in registry.iter() {
            if let Err(e) = monitor.persist() {
                error!(
                    "Failed to persist state of {} to {}: {}",
                    monitor.path().display(),
                    monitor.checkpoint_path().display(),
                    e
                );
                failures += 1;
            }
        }

        self.stats.persist_failures += failures as u64;
        failures
    }

    fn poll_monitor(&mut self, monitor: &mut Monitor, sink: &mut dyn MessageSink) {
        let before = monitor.counters();
        let result = monitor.poll();
        let after = monitor.counters();
        self.stats.rotations += after.rotations - before.rotations;
        self.stats.truncations += after.truncations - before.truncations;

        let records = match result {
            Ok(records) => records,
            Err(MonitorError::Transient {
                path,
                source: ReaderError::FileNotFound(_),
            }) => {
                debug!("{} not present, will retry", path.display());
                self.stats.transient_errors += 1;
                return;
            }
            Err(e @ MonitorError::Transient { .. }) => {
                warn!("{}", e);
                self.stats.transient_errors += 1;
                return;
            }
            Err(e @ MonitorError::Fatal { .. }) => {
                error!("{}", e);
                return;
            }
        };

        if records.is_empty() {
            return;
        }

        debug!(
            "Forwarding {} record(s) from {}",
            records.len(),
            monitor.path().display()
        );

        let timestamp = Utc::now();
        for record in records {
            let message = Message {
                record,
                tag: monitor.tag().to_string(),
                facility: monitor.facility(),
                severity: monitor.severity(),
                hostname: self.hostname.clone(),
                timestamp,
            };

            match sink.submit(&message) {
                Ok(()) => self.stats.records_forwarded += 1,
                Err(e) => {
                    warn!(
                        "Sink rejected record from {}: {}",
                        monitor.path().display(),
                        e
                    );
                    self.stats.sink_failures += 1;
                }
            }
        }
    }

    /// Suspend until the next pass; returns `true` if cancellation was requested
    fn wait_for_next_pass(&self) -> bool {
        let timeout = self.settings.poll_interval.max(MIN_SUSPEND);
        match self.shutdown_receiver.recv_timeout(timeout) {
            Ok(()) => {
                info!("Shutdown requested");
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

/// Name of the local host, or `"localhost"` if it can't be determined
#[cfg(unix)]
pub fn local_hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        warn!(
            "gethostname failed: {}",
            std::io::Error::last_os_error()
        );
        return "localhost".to_string();
    }

    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    match String::from_utf8_lossy(&buf[..len]).into_owned() {
        name if name.is_empty() => "localhost".to_string(),
        name => name,
    }
}

/// Name of the local host, or `"localhost"` if it can't be determined
#[cfg(not(unix))]
pub fn local_hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}
