//! Console presenter
//!
//! Prints status lines as the session moves between waiting and
//! transferring, with a spinner while the device is awaited.

use chrono::Local;
use dropcopy_core::{Presenter, TransferError};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const READY_MSG: &str = "Waiting for new downloaded file";

pub struct ConsolePresenter {
    device_dir: PathBuf,
    spinner: Option<ProgressBar>,
    draw_spinner: bool,
}

impl ConsolePresenter {
    pub fn new(device_dir: PathBuf) -> Self {
        Self {
            device_dir,
            spinner: None,
            draw_spinner: true,
        }
    }

    /// Presenter that prints status lines but never draws the spinner
    #[cfg(test)]
    pub fn without_spinner(device_dir: PathBuf) -> Self {
        Self {
            device_dir,
            spinner: None,
            draw_spinner: false,
        }
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.spinner.is_some()
    }

    fn start_spinner(&mut self) {
        let spinner = if self.draw_spinner {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Waiting for {}", self.device_dir.display()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Presenter for ConsolePresenter {
    fn waiting(&mut self) {
        self.stop_spinner();
        println!("{} {}", timestamp().dimmed(), READY_MSG.green());
    }

    fn file_detected(&mut self, path: &Path) {
        println!(
            "{} {} {}",
            timestamp().dimmed(),
            "Detected new file:".yellow(),
            path.display()
        );
        println!("{} {}", timestamp().dimmed(), "Reset device to mount as USB drive".yellow().bold());
        self.start_spinner();
    }

    fn transfer_complete(&mut self, written: &Path) {
        self.stop_spinner();
        println!(
            "{} {} wrote file to: {}",
            timestamp().dimmed(),
            "✓".green(),
            written.display()
        );
    }

    fn transfer_failed(&mut self, path: &Path, error: &TransferError) {
        self.stop_spinner();
        eprintln!(
            "{} {} could not copy {}: {}",
            timestamp().dimmed(),
            "✗".red(),
            path.display(),
            error
        );
    }
}

impl Drop for ConsolePresenter {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_lifecycle() {
        let mut presenter = ConsolePresenter::without_spinner(PathBuf::from("/Volumes/CPLAYBOOT"));
        presenter.waiting();
        assert!(!presenter.is_busy());

        presenter.file_detected(Path::new("/tmp/scan/blink.uf2"));
        assert!(presenter.is_busy());

        presenter.transfer_complete(Path::new("/Volumes/CPLAYBOOT/blink.uf2"));
        assert!(!presenter.is_busy());

        presenter.file_detected(Path::new("/tmp/scan/blink.uf2"));
        presenter.transfer_failed(Path::new("/tmp/scan/blink.uf2"), &TransferError::Cancelled);
        assert!(!presenter.is_busy());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.matches(':').count(), 2);
    }
}
