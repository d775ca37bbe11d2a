//! Terminal progress for import runs

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Row counter spinner; hidden for quiet or non-interactive runs
#[derive(Debug, Clone)]
pub struct RowProgress {
    bar: ProgressBar,
}

impl RowProgress {
    /// Spinner drawn on stderr
    pub fn spinner(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg} {pos} rows ({per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Progress that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Restart the counter for a new pass.
    pub fn start_pass(&self, message: &str) {
        self.bar.set_position(0);
        self.bar.set_message(message.to_string());
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl Default for RowProgress {
    fn default() -> Self {
        Self::hidden()
    }
}
