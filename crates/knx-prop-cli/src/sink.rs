//! Console output of the tools.

use std::io::Write;

use colored::*;

use knx_prop_core::sink::{Severity, Sink};

/// Prints results to stdout and messages to stderr.
///
/// Info lines are status output and only shown when enabled.
#[derive(Debug)]
pub struct ConsoleSink {
    show_info: bool,
}

impl ConsoleSink {
    pub fn new(show_info: bool) -> Self {
        Self { show_info }
    }

    pub fn shows(&self, severity: Severity) -> bool {
        severity != Severity::Info || self.show_info
    }
}

impl Sink for ConsoleSink {
    fn emit(&self, severity: Severity, message: &str) {
        if !self.shows(severity) {
            return;
        }
        match severity {
            Severity::Always => println!("{}", message),
            Severity::Error => eprintln!("{}", message.red()),
            Severity::Info => eprintln!("{}", message),
        }
    }

    fn prompt(&self, prompt: &str) {
        print!("{}", prompt);
        // A failed flush only loses the prompt.
        let _ = std::io::stdout().flush();
    }
}
