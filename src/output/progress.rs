//! Progress indicators using indicatif

#![allow(clippy::expect_used)] // Templates are compile-time constants

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::application::ports::ProgressReporter;

/// Create a spinner for indeterminate progress.
///
/// # Panics
///
/// Panics if the spinner template string is invalid (it is a compile-time constant and will not panic).
#[must_use]
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "])
            .template("  {spinner:.cyan} {msg} {elapsed:.dim}")
            .expect("valid template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Finish a spinner with a checkmark on the left.
pub fn finish_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {prefix} {msg}")
            .expect("valid template"),
    );
    pb.set_prefix("✓");
    pb.finish_with_message(msg.to_string());
}

/// Clear a spinner without leaving a line behind.
pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

/// `ProgressReporter` that routes steps into a live spinner.
///
/// Warnings and successes are printed above the spinner so they stay on
/// screen after it is cleared.
pub struct SpinnerReporter {
    pb: ProgressBar,
}

impl SpinnerReporter {
    #[must_use]
    pub fn new(msg: &str) -> Self {
        Self { pb: spinner(msg) }
    }

    /// Stop the spinner and remove it from the terminal.
    pub fn clear(&self) {
        finish_clear(&self.pb);
    }
}

impl ProgressReporter for SpinnerReporter {
    fn step(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    fn success(&self, message: &str) {
        self.pb.println(format!("  ✓ {message}"));
    }

    fn warn(&self, message: &str) {
        self.pb.println(format!("  ! {message}"));
    }
}

impl Drop for SpinnerReporter {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}
