//! Structured JSON logger
//!
//! Every log line is a single JSON object with an `event` name, a
//! `severity`, and the caller's fields. Keys are emitted in sorted order
//! so identical events produce byte-identical lines, which keeps logs
//! diffable across runs.

use std::fmt;
use std::io::{self, Write};

use serde_json::{Map, Value};

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal operations
    Info,
    /// Something unusual was handled
    Warn,
    /// An operation failed
    Error,
}

impl Severity {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synchronous structured logger.
pub struct Logger;

impl Logger {
    /// Log an INFO event to stdout.
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(Severity::Info, event, fields, &mut io::stdout());
    }

    /// Log a WARN event to stdout.
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(Severity::Warn, event, fields, &mut io::stdout());
    }

    /// Log an ERROR event to stderr.
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(Severity::Error, event, fields, &mut io::stderr());
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        // serde_json's map keeps keys sorted, which gives the
        // deterministic ordering for free.
        let mut object = Map::new();
        object.insert("event".to_string(), Value::String(event.to_string()));
        object.insert(
            "severity".to_string(),
            Value::String(severity.as_str().to_string()),
        );
        for (key, value) in fields {
            object.insert((*key).to_string(), Value::String((*value).to_string()));
        }

        // A logger that panics on a full pipe would be worse than a lost
        // line.
        let _ = writeln!(writer, "{}", Value::Object(object));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut buf = Vec::new();
        Logger::log_to_writer(severity, event, fields, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_line_is_valid_json() {
        let line = render(
            Severity::Info,
            "RECOVERY_FILE_COMPLETE",
            &[("file", "1.tsd"), ("crashed", "true")],
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "RECOVERY_FILE_COMPLETE");
        assert_eq!(value["severity"], "INFO");
        assert_eq!(value["crashed"], "true");
    }

    #[test]
    fn test_deterministic_output() {
        let a = render(Severity::Warn, "E", &[("b", "2"), ("a", "1")]);
        let b = render(Severity::Warn, "E", &[("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_escaping_handled_by_serializer() {
        let line = render(Severity::Error, "E", &[("path", "a\"b\\c")]);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["path"], "a\"b\\c");
    }
}
