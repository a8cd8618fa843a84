//! In-memory sink
//!
//! Records every committed event in memory. Useful for tests and for
//! inspecting pipeline output programmatically; a cloneable recorder exposes
//! the captured events and the connect/commit counts, and can inject
//! failures into the next connect or write.

use crate::core::{LogEvent, PipelineError, Result, Sink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counters {
    startups: AtomicUsize,
    shutdowns: AtomicUsize,
    connects: AtomicUsize,
    commits: AtomicUsize,
    fail_next_connect: AtomicBool,
    fail_next_write: AtomicBool,
}

#[derive(Default)]
struct Recording {
    /// Events made durable by a commit.
    committed: Vec<LogEvent>,
    /// Events written in the current open round-trip, pending commit.
    pending: Vec<LogEvent>,
}

pub struct MemorySink {
    name: String,
    recording: Arc<Mutex<Recording>>,
    counters: Arc<Counters>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recording: Arc::new(Mutex::new(Recording::default())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Cloneable view of everything this sink has seen.
    pub fn recorder(&self) -> MemoryRecorder {
        MemoryRecorder {
            recording: Arc::clone(&self.recording),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn startup(&mut self) -> Result<()> {
        self.counters.startups.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.counters.shutdowns.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn connect_and_start(&mut self) -> Result<()> {
        if self.counters.fail_next_connect.swap(false, Ordering::Relaxed) {
            return Err(PipelineError::sink(&self.name, "injected connect failure"));
        }
        self.counters.connects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_internal(&mut self, event: &LogEvent) -> Result<()> {
        if self.counters.fail_next_write.swap(false, Ordering::Relaxed) {
            return Err(PipelineError::sink(&self.name, "injected write failure"));
        }
        self.recording.lock().pending.push(event.clone());
        Ok(())
    }

    fn commit_and_close(&mut self) -> Result<()> {
        self.counters.commits.fetch_add(1, Ordering::Relaxed);
        let mut recording = self.recording.lock();
        let pending = std::mem::take(&mut recording.pending);
        recording.committed.extend(pending);
        Ok(())
    }
}

/// Inspection handle for a [`MemorySink`].
#[derive(Clone)]
pub struct MemoryRecorder {
    recording: Arc<Mutex<Recording>>,
    counters: Arc<Counters>,
}

impl MemoryRecorder {
    /// All committed events, in delivery order.
    pub fn events(&self) -> Vec<LogEvent> {
        self.recording.lock().committed.clone()
    }

    /// Messages of all committed events, in delivery order.
    pub fn messages(&self) -> Vec<String> {
        self.recording
            .lock()
            .committed
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn committed_len(&self) -> usize {
        self.recording.lock().committed.len()
    }

    pub fn startups(&self) -> usize {
        self.counters.startups.load(Ordering::Relaxed)
    }

    pub fn shutdowns(&self) -> usize {
        self.counters.shutdowns.load(Ordering::Relaxed)
    }

    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::Relaxed)
    }

    pub fn commits(&self) -> usize {
        self.counters.commits.load(Ordering::Relaxed)
    }

    /// Make the next `connect_and_start` fail once.
    pub fn fail_next_connect(&self) {
        self.counters.fail_next_connect.store(true, Ordering::Relaxed);
    }

    /// Make the next `write_internal` fail once.
    pub fn fail_next_write(&self) {
        self.counters.fail_next_write.store(true, Ordering::Relaxed);
    }
}
