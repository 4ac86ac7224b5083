use anyhow::Context;
use clap::Parser;
use filetail::config::{Config, MonitorDefinition};
use filetail::error::ConfigError;
use filetail::sink::JsonLinesSink;
use filetail::FileInput;
use log::{error, info, warn};
use std::path::PathBuf;

/// Command-line arguments for the file tailing input
#[derive(Parser)]
#[command(
    name = "filetail",
    about = "Tail growing text files and forward each line",
    long_about = "Continuously tails a set of text files, splits new content into \
                  newline-delimited records and writes each record as a JSON line on \
                  stdout. Read positions are checkpointed so restarts neither re-read \
                  nor drop data."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Extra files to monitor, in addition to the configuration file
    #[arg(short, long = "monitor", value_name = "PATH")]
    monitors: Vec<PathBuf>,

    /// Override the checkpoint work directory
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Override the poll interval
    #[arg(long, value_name = "SECONDS")]
    poll_interval: Option<u64>,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }

            if let Some(extension) = config_path.extension() {
                if extension != "toml" {
                    warn!(
                        "Configuration file does not have .toml extension: {}",
                        config_path.display()
                    );
                }
            }
        }

        for path in &self.monitors {
            if !path.is_absolute() {
                return Err(format!("Monitored path must be absolute: {}", path.display()));
            }
        }

        if let Some(ref work_dir) = self.work_dir {
            if work_dir.exists() && !work_dir.is_dir() {
                return Err(format!(
                    "Work directory is not a directory: {}",
                    work_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Apply command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref work_dir) = self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Some(seconds) = self.poll_interval {
            config.poll_interval_seconds = seconds;
        }
    }
}

/// Load configuration from file or use defaults
///
/// A missing or unreadable file falls back to defaults with a warning; a file
/// that exists but is invalid is an error.
fn load_config(config_path: Option<&PathBuf>) -> Result<Config, ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => Ok(config),
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path.display()
                    );
                    Ok(Config::default())
                }
                Err(e) => Err(e),
            }
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let mut config = load_config(cli.config.as_ref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    let sink = JsonLinesSink::new(std::io::stdout());
    let mut input = FileInput::new(config.clone(), Box::new(sink));

    for path in &cli.monitors {
        let definition = MonitorDefinition::new(path)
            .with_facility(config.default_facility())
            .with_severity(config.default_severity());
        if let Err(e) = input.register_monitor(definition) {
            warn!("Ignoring --monitor {}: {}", path.display(), e);
        }
    }

    if !input.will_run() {
        anyhow::bail!("no files configured to be monitored");
    }

    let shutdown = input.shutdown_handle();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down gracefully...");
        shutdown.shutdown();
    })
    .context("failed to install signal handler")?;

    info!(
        "Tailing {} file(s). Press Ctrl+C to stop.",
        input.registry().len()
    );

    input.run()?;
    input.cleanup();

    info!("filetail shutdown complete");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
