//! dropcopy - copy newly downloaded files onto a device once it mounts

use anyhow::{Context, Result};
use clap::Parser;
use dropcopy_core::{ArrivalDetector, CopyConfig, Session, TransferSequencer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use watcher::Watcher;

mod console;
mod logging;

use console::ConsolePresenter;

/// Watch a folder for a new file and copy it to a device folder once the device appears
#[derive(Parser, Debug)]
#[command(name = "dropcopy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder to scan for new files
    #[arg(short = 's', long = "scan-folder", value_name = "DIR")]
    scan_folder: Option<PathBuf>,

    /// Device folder to copy the file to
    #[arg(short = 'd', long = "device-folder", value_name = "DIR")]
    device_folder: Option<PathBuf>,

    /// File pattern to scan for (default: *.uf2)
    #[arg(short = 'e', long = "ext", value_name = "GLOB")]
    ext: Option<String>,

    /// Match the pattern case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Stop waiting for the device after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Copy to a temporary name and rename into place
    #[arg(long)]
    atomic: bool,

    /// Config file (default: <config dir>/dropcopy/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Defaults, then the config file, then flags
    fn resolve_config(&self) -> Result<CopyConfig> {
        let mut config = match &self.config {
            Some(path) => CopyConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => CopyConfig::load_default().context("Failed to load config")?,
        };

        if let Some(dir) = &self.scan_folder {
            config.scan_dir = dir.clone();
        }
        if let Some(dir) = &self.device_folder {
            config.device_dir = dir.clone();
        }
        if let Some(pattern) = &self.ext {
            config.pattern = pattern.clone();
        }
        if self.case_sensitive {
            config.case_sensitive = true;
        }
        if self.timeout.is_some() {
            config.destination_timeout_secs = self.timeout;
        }
        if self.atomic {
            config.atomic_copy = true;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config = cli.resolve_config()?;
    if cli.print_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    run(config).await
}

async fn run(config: CopyConfig) -> Result<()> {
    let detector = Arc::new(ArrivalDetector::with_threshold(config.stable_threshold()));
    let watcher = Watcher::from_config(&config, detector.clone())
        .with_context(|| format!("Failed to watch {}", config.scan_dir.display()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {}", e);
                // Keep the sender alive so the session does not see a shutdown
                std::future::pending::<()>().await;
            }
        }
    });

    let sequencer = TransferSequencer::new(config.transfer_options());
    let mut session = Session::new(detector, sequencer, config.device_dir.clone(), config.poll_interval());
    let mut presenter = ConsolePresenter::new(config.device_dir.clone());

    let stats = session.run(&mut presenter, shutdown_rx).await;
    drop(presenter);

    watcher.stop().context("Failed to stop watcher")?;
    println!(
        "Stopped: {} transferred, {} failed",
        stats.transferred, stats.failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dropcopy").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "scan_dir = \"/from/file\"\ndevice_dir = \"/file/dev\"\npattern = \"*.bin\"\n",
        )
        .unwrap();

        let cli = parse(&[
            "--config",
            config_path.to_str().unwrap(),
            "-s",
            "/from/flag",
            "-e",
            "*.hex",
            "--timeout",
            "30",
            "--atomic",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.scan_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.device_dir, PathBuf::from("/file/dev"));
        assert_eq!(config.pattern, "*.hex");
        assert_eq!(config.destination_timeout_secs, Some(30));
        assert!(config.atomic_copy);
        assert!(!config.case_sensitive);
    }

    #[test]
    fn test_invalid_flag_value_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "").unwrap();

        let cli = parse(&["--config", config_path.to_str().unwrap(), "--timeout", "0"]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_verbosity_count() {
        let cli = parse(&["-vv", "--print-config"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.print_config);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
