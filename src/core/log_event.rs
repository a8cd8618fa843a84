//! Log event structure
//!
//! `LogEvent` is the mutable backing value filled in place by producer
//! threads and copied through the ordered transport. All fields are owned so
//! an event can cross threads without borrowing from thread-local state, and
//! `clear` resets the payload fields so a recycled slot never leaks values
//! from a previous cycle.

use super::level::Level;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opt-in source location of the originating log call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn from_caller(location: &std::panic::Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Serializable rendering of an error and its `source()` chain.
///
/// Captured at event-fill time as owned strings; the live error value is
/// never retained, so the event stays `Send` and serializable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorProxy {
    /// Root message first, each `source()` cause after it.
    pub chain: Vec<String>,
}

impl ErrorProxy {
    pub fn capture(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = vec![error.to_string()];
        let mut cause = error.source();
        while let Some(err) = cause {
            chain.push(err.to_string());
            cause = err.source();
        }
        Self { chain }
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl fmt::Display for ErrorProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for message in &self.chain {
            if first {
                write!(f, "{}", message)?;
                first = false;
            } else {
                write!(f, "; caused by: {}", message)?;
            }
        }
        Ok(())
    }
}

/// One logging occurrence.
///
/// `end_of_batch` is true only on the last event of one consumer drain pass;
/// sinks may use it to decide whether to flush immediately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub logger_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Fully-qualified origin of the log call (module path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    pub level: Level,
    pub message: String,
    pub context_map: HashMap<String, String>,
    /// Most-recent-last.
    pub context_stack: Vec<String>,
    /// Epoch milliseconds.
    pub time_millis: i64,
    /// Monotonic nanosecond counter for ordering within one millisecond.
    pub nano_time: u64,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    /// Scheduling priority of the producing thread, where the platform
    /// exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_priority: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorProxy>,
    #[serde(default)]
    pub end_of_batch: bool,
}

impl LogEvent {
    /// Append `message` to `dst` with newlines, carriage returns and tabs
    /// escaped, preventing injection of fake log lines. Writes in place so a
    /// recycled slot reuses its message buffer.
    pub fn push_sanitized(dst: &mut String, message: &str) {
        for ch in message.chars() {
            match ch {
                '\n' => dst.push_str("\\n"),
                '\r' => dst.push_str("\\r"),
                '\t' => dst.push_str("\\t"),
                other => dst.push(other),
            }
        }
    }

    /// Reset all payload fields so the slot can be reused.
    ///
    /// Thread identity fields are kept: a recycled slot stays bound to its
    /// producing thread. Collections keep their capacity.
    pub fn clear(&mut self) {
        self.logger_name.clear();
        self.marker = None;
        self.caller = None;
        self.level = Level::Off;
        self.message.clear();
        self.context_map.clear();
        self.context_stack.clear();
        self.time_millis = 0;
        self.nano_time = 0;
        self.source = None;
        self.error = None;
        self.end_of_batch = false;
    }
}
