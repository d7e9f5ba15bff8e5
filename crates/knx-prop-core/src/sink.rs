//! User facing output of the tools.
//!
//! Results and messages go to a [`Sink`], so the same engine can print to a
//! console or collect lines in memory.

use parking_lot::Mutex;

/// How a line is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Results, always shown
    Always,
    Error,
    /// Progress and status information
    Info,
}

/// Receiver of user facing output.
pub trait Sink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);

    /// Prompt shown before reading interactive input.
    fn prompt(&self, _prompt: &str) {}

    fn always(&self, message: &str) {
        self.emit(Severity::Always, message);
    }

    fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }

    fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }
}

/// Sink keeping every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Severity, String)>>,
    prompts: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().clone()
    }

    /// Messages of one severity, in order.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn prompt_count(&self) -> usize {
        *self.prompts.lock()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Sink for MemorySink {
    fn emit(&self, severity: Severity, message: &str) {
        self.lines.lock().push((severity, message.to_string()));
    }

    fn prompt(&self, _prompt: &str) {
        *self.prompts.lock() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_filters_by_severity() {
        let sink = MemorySink::new();
        sink.always("0x0a");
        sink.error("sorry, wrong number of arguments");
        sink.info("connection closed (server shutdown)");
        sink.prompt("> ");

        assert_eq!(sink.lines().len(), 3);
        assert_eq!(sink.messages(Severity::Always), vec!["0x0a"]);
        assert_eq!(
            sink.messages(Severity::Info),
            vec!["connection closed (server shutdown)"]
        );
        assert_eq!(sink.prompt_count(), 1);

        sink.clear();
        assert!(sink.lines().is_empty());
    }
}
