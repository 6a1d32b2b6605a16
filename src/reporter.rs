//! Human-readable progress reporting.
//!
//! The download engine never prints directly; it reports through a
//! [`Reporter`] chosen once from the configuration. Structured diagnostics
//! go through `tracing` independently of this.

use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Config;

/// Indentation unit for nested progress lines.
pub const INDENT: &str = "    ";

/// Sink for progress messages.
pub trait Reporter: Send + Sync {
    /// A step in the current operation ("Decrypting...").
    fn step(&self, indent: usize, message: &str);

    /// A track that will not be downloaded, with the reason.
    fn skip(&self, indent: usize, message: &str);

    /// Start tracking a byte transfer of `total` bytes, if known.
    fn transfer(&self, total: Option<u64>) -> Box<dyn Transfer>;
}

/// Progress of one byte transfer.
pub trait Transfer: Send {
    fn advance(&mut self, bytes: u64);
    fn finish(self: Box<Self>);
}

/// Prefix `message` with `indent` indentation units.
pub fn indented(indent: usize, message: &str) -> String {
    format!("{}{}", INDENT.repeat(indent), message)
}

/// Pick the reporter matching the `quiet` setting.
pub fn for_config(config: &Config) -> Box<dyn Reporter> {
    if config.quiet {
        Box::new(QuietReporter)
    } else {
        Box::new(ConsoleReporter)
    }
}

/// Prints to stdout and draws byte progress bars.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn step(&self, indent: usize, message: &str) {
        println!("{}", indented(indent, message));
    }

    fn skip(&self, indent: usize, message: &str) {
        println!("{}", indented(indent, message));
    }

    fn transfer(&self, total: Option<u64>) -> Box<dyn Transfer> {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                ) {
                    bar.set_style(style.progress_chars("=> "));
                }
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        Box::new(BarTransfer(bar))
    }
}

struct BarTransfer(ProgressBar);

impl Transfer for BarTransfer {
    fn advance(&mut self, bytes: u64) {
        self.0.inc(bytes);
    }

    fn finish(self: Box<Self>) {
        self.0.finish_and_clear();
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuietReporter;

impl Reporter for QuietReporter {
    fn step(&self, _indent: usize, _message: &str) {}

    fn skip(&self, _indent: usize, _message: &str) {}

    fn transfer(&self, _total: Option<u64>) -> Box<dyn Transfer> {
        Box::new(NoTransfer)
    }
}

/// A transfer that tracks nothing.
pub struct NoTransfer;

impl Transfer for NoTransfer {
    fn advance(&mut self, _bytes: u64) {}

    fn finish(self: Box<Self>) {}
}
