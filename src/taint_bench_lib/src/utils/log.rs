//! Structs and functions for generating and printing log messages.

use crate::prelude::*;
use std::collections::BTreeMap;

/// A generic log message.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct LogMessage {
    /// The log message.
    pub text: String,
    /// The severity/type of the log message.
    pub level: LogLevel,
    /// The object the message is related to, e.g. a project binary or a revision.
    pub location: Option<String>,
    /// The pipeline step or tool where the message originated.
    pub source: Option<String>,
}

impl LogMessage {
    fn with_level(level: LogLevel, text: impl Into<String>) -> LogMessage {
        LogMessage {
            text: text.into(),
            level,
            location: None,
            source: None,
        }
    }

    pub fn new_info(text: impl Into<String>) -> LogMessage {
        LogMessage::with_level(LogLevel::Info, text)
    }

    pub fn new_debug(text: impl Into<String>) -> LogMessage {
        LogMessage::with_level(LogLevel::Debug, text)
    }

    pub fn new_error(text: impl Into<String>) -> LogMessage {
        LogMessage::with_level(LogLevel::Error, text)
    }

    /// Associate a specific location to the log message.
    pub fn location(mut self, location: impl Into<String>) -> LogMessage {
        self.location = Some(location.into());
        self
    }

    /// Set the name of the source step for the log message.
    pub fn source(mut self, source: impl Into<String>) -> LogMessage {
        self.source = Some(source.into());
        self
    }
}

/// The severity/type of a log message.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum LogLevel {
    /// Messages intended for debugging.
    Debug,
    /// Errors encountered while running a step.
    Error,
    /// Non-error messages intended for the user.
    Info,
}

impl std::fmt::Display for LogMessage {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            LogLevel::Debug => write!(formatter, "DEBUG: ")?,
            LogLevel::Error => write!(formatter, "ERROR: ")?,
            LogLevel::Info => write!(formatter, "INFO: ")?,
        };
        match (&self.source, &self.location) {
            (Some(source), Some(location)) => write!(formatter, "{source} @ {location}: ")?,
            (Some(source), None) => write!(formatter, "{source}: ")?,
            (None, Some(location)) => write!(formatter, "{location}: ")?,
            (None, None) => (),
        };
        write!(formatter, "{}", self.text)
    }
}

/// Render the given log messages either as plain text lines or as a pretty-printed JSON array.
pub fn render_messages(logs: &[LogMessage], emit_json: bool) -> Result<String, Error> {
    if emit_json {
        Ok(serde_json::to_string_pretty(logs)? + "\n")
    } else {
        Ok(logs
            .iter()
            .map(|log| format!("{log}\n"))
            .collect::<String>())
    }
}

/// Print all provided log messages.
///
/// The messages are written to the file at `out_path` if one is given and to `stdout` otherwise.
/// If `emit_json` is set, the messages are converted to JSON for the output.
pub fn print_all_messages(
    logs: &[LogMessage],
    out_path: Option<&str>,
    emit_json: bool,
) -> Result<(), Error> {
    let output = render_messages(logs, emit_json)?;
    if let Some(file_path) = out_path {
        std::fs::write(file_path, output)
            .with_context(|| format!("Writing to output path {file_path} failed"))?;
    } else {
        print!("{output}");
    }
    Ok(())
}

/// Remove all debug messages from `all_logs`.
pub fn remove_debug_messages(all_logs: &mut Vec<LogMessage>) {
    all_logs.retain(|log| log.level != LogLevel::Debug);
}

/// Append an info message with the number of debug messages of each source,
/// plus one for the debug messages without a source.
pub fn add_debug_log_statistics(all_logs: &mut Vec<LogMessage>) {
    let mut source_debug_log_count: BTreeMap<String, u64> = BTreeMap::new();
    let mut general_debug_log_count = 0u64;
    for log in all_logs.iter().filter(|log| log.level == LogLevel::Debug) {
        match &log.source {
            Some(source) => *source_debug_log_count.entry(source.clone()).or_default() += 1,
            None => general_debug_log_count += 1,
        }
    }
    for (source, count) in source_debug_log_count {
        all_logs.push(LogMessage::new_info(format!("Logged {count} debug log messages.")).source(source));
    }
    if general_debug_log_count > 0 {
        all_logs.push(LogMessage::new_info(format!(
            "Logged {general_debug_log_count} general debug log messages."
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_log_message() {
        let msg = LogMessage::new_error("FileCheck failed")
            .source("ParseAndValidatePhasarOutput")
            .location("xz/xz");
        assert_eq!(
            format!("{msg}"),
            "ERROR: ParseAndValidatePhasarOutput @ xz/xz: FileCheck failed"
        );
        assert_eq!(
            format!("{}", LogMessage::new_info("done")),
            "INFO: done".to_string()
        );
    }

    #[test]
    fn debug_statistics() {
        let mut logs = vec![
            LogMessage::new_debug("a").source("Compile"),
            LogMessage::new_debug("b").source("Compile"),
            LogMessage::new_debug("c"),
            LogMessage::new_info("d").source("Compile"),
        ];
        add_debug_log_statistics(&mut logs);
        assert_eq!(logs.len(), 6);
        assert_eq!(logs[4].text, "Logged 2 debug log messages.");
        assert_eq!(logs[4].source.as_deref(), Some("Compile"));
        assert_eq!(logs[5].text, "Logged 1 general debug log messages.");

        remove_debug_messages(&mut logs);
        assert_eq!(logs.len(), 3);
    }

    #[test]
    fn render_as_json() {
        let logs = vec![LogMessage::new_info("hello")];
        let rendered = render_messages(&logs, true).unwrap();
        let parsed: Vec<LogMessage> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, logs);
        assert_eq!(render_messages(&logs, false).unwrap(), "INFO: hello\n");
    }
}
