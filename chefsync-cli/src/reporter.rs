//! Terminal reporter: colored operator-facing lines.

use colored::Colorize;

use chefsync_core::reporter::format_diff;
use chefsync_core::{DiffResult, Reporter};

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        match message.strip_prefix("Would ") {
            Some(rest) => println!("{}{rest}", "Would ".cyan()),
            None => println!("{message}"),
        }
    }

    fn warn(&self, message: &str) {
        eprintln!("{} {message}", "WARNING:".yellow().bold());
    }

    fn fatal(&self, message: &str) {
        eprintln!("{} {message}", "FATAL:".red().bold());
    }

    fn cookbook_status(&self, cookbook: &str, diff: &DiffResult) {
        if diff.is_empty() {
            println!("{cookbook} => {}", "match".green());
        } else {
            println!("{cookbook} => {}", "mismatch".yellow());
            println!("  {}", format_diff(diff));
        }
    }
}
