//! Sink implementations and the buffered sink manager

pub mod buffered;
#[cfg(feature = "console")]
pub mod console;
#[cfg(feature = "file")]
pub mod file;
pub mod memory;
pub mod registry;

pub use buffered::{BufferedSinkManager, ManagerState, SinkHandle};
#[cfg(feature = "console")]
pub use console::ConsoleSink;
#[cfg(feature = "file")]
pub use file::FileSink;
pub use memory::{MemoryRecorder, MemorySink};
pub use registry::{SinkConstructor, SinkRegistry, SinkSpec};

use crate::core::LogEvent;
use chrono::DateTime;

/// Render one event as a single text line, shared by the console and file
/// sinks. Structured layouts are out of scope here; this is the minimal
/// human-readable form.
pub(crate) fn render_line(event: &LogEvent) -> String {
    let timestamp = DateTime::from_timestamp_millis(event.time_millis)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| event.time_millis.to_string());

    let thread = event
        .thread_name
        .as_deref()
        .unwrap_or(event.thread_id.as_str());

    let mut line = format!(
        "[{}] [{:5}] [{}] {} - {}",
        timestamp,
        event.level.to_str(),
        thread,
        event.logger_name,
        event.message
    );

    if let Some(marker) = &event.marker {
        line.push_str(" <");
        line.push_str(marker);
        line.push('>');
    }
    if !event.context_map.is_empty() {
        line.push_str(" |");
        // sorted for a stable line; insertion order is not meaningful
        let mut keys: Vec<&String> = event.context_map.keys().collect();
        keys.sort();
        for key in keys {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            line.push_str(&event.context_map[key]);
        }
    }
    if !event.context_stack.is_empty() {
        line.push_str(" [");
        line.push_str(&event.context_stack.join(" > "));
        line.push(']');
    }
    if let Some(source) = &event.source {
        line.push_str(&format!(" ({})", source));
    }
    if let Some(error) = &event.error {
        line.push_str(" !! ");
        line.push_str(&error.to_string());
    }
    line
}
