//! Buffered sink manager
//!
//! Decorates a [`Sink`] with commit batching and a failover hand-off
//! protocol. With buffer size 0 every write is one synchronous
//! connect/write/commit round-trip; with size N writes accumulate immutable
//! copies and the whole buffer is flushed in arrival order when the Nth
//! event lands. The buffer is cleared only after a successful commit, so
//! after any failure every not-yet-durable event is recoverable through the
//! failover calls: a replacement sink receives each event exactly once and
//! this manager starts clean.
//!
//! Connection and write failures are not retried here; retry policy belongs
//! to the caller's failover chain.

use crate::core::{LogEvent, PipelineError, Result, Sink};
use parking_lot::Mutex;

/// Lifecycle state of a manager. Transitions are monotonic
/// (`NotStarted -> Running -> Stopped`): once stopped, a manager never runs
/// again and accepts nothing except the explicit failover hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    NotStarted,
    Running,
    Stopped,
}

pub struct BufferedSinkManager {
    name: String,
    sink: Box<dyn Sink>,
    buffer: Vec<LogEvent>,
    buffer_size: usize,
    state: ManagerState,
}

impl BufferedSinkManager {
    pub fn new(name: impl Into<String>, sink: Box<dyn Sink>, buffer_size: usize) -> Self {
        Self {
            name: name.into(),
            sink,
            buffer: Vec::with_capacity(buffer_size),
            buffer_size,
            state: ManagerState::NotStarted,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.state == ManagerState::Running
    }

    pub fn is_buffered(&self) -> bool {
        self.buffer_size > 0
    }

    /// Number of events pending commit.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Start the manager. Idempotent while running; a stopped manager
    /// rejects restarts because the lifecycle is monotonic.
    pub fn startup(&mut self) -> Result<()> {
        match self.state {
            ManagerState::Running => Ok(()),
            ManagerState::Stopped => Err(PipelineError::sink_stopped(&self.name)),
            ManagerState::NotStarted => {
                self.sink.startup()?;
                self.state = ManagerState::Running;
                Ok(())
            }
        }
    }

    /// Flush whatever is buffered, then stop the manager and tear down the
    /// sink. Repeated shutdown calls are ignored.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.is_running() {
            self.state = ManagerState::Stopped;
            return Ok(());
        }
        let flushed = self.flush_buffer();
        self.state = ManagerState::Stopped;
        self.sink.shutdown()?;
        flushed
    }

    /// Write one event.
    ///
    /// Buffer size 0: immediate connect/write/commit, errors propagate to
    /// the caller. Buffer size N: an immutable copy is appended; reaching N
    /// entries triggers one connect, N writes in arrival order, one commit.
    pub fn write(&mut self, event: &LogEvent) -> Result<()> {
        if !self.is_running() {
            return Err(PipelineError::sink_stopped(&self.name));
        }
        if self.buffer_size == 0 {
            return self.write_through(event);
        }
        self.buffer.push(event.clone());
        if self.buffer.len() >= self.buffer_size {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Force a connect/write/commit cycle for whatever is currently
    /// buffered, even below threshold.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buffer()
    }

    /// Hand off every buffered, not-yet-durable event because `causal`
    /// triggered a sink failure. Returns the events in original order with
    /// the causal event last, and leaves the buffer empty for a fresh start.
    pub fn on_failover_event(&mut self, causal: &LogEvent) -> Vec<LogEvent> {
        let mut events = std::mem::take(&mut self.buffer);
        if events.last() != Some(causal) {
            events.push(causal.clone());
        }
        events
    }

    /// Hand off every buffered, not-yet-durable event after a failure with
    /// no single causal event. Returns them in original order and leaves the
    /// buffer empty.
    pub fn on_failover_exception(&mut self) -> Vec<LogEvent> {
        std::mem::take(&mut self.buffer)
    }

    fn write_through(&mut self, event: &LogEvent) -> Result<()> {
        self.sink.connect_and_start()?;
        self.sink.write_internal(event)?;
        self.sink.commit_and_close()
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        // The buffer is cleared only after a successful commit: events
        // written but not committed stay recoverable via failover.
        self.sink.connect_and_start()?;
        for event in &self.buffer {
            self.sink.write_internal(event)?;
        }
        self.sink.commit_and_close()?;
        self.buffer.clear();
        Ok(())
    }
}

impl std::fmt::Debug for BufferedSinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedSinkManager")
            .field("name", &self.name)
            .field("buffer_size", &self.buffer_size)
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .finish()
    }
}

/// Shareable, serialized access to a [`BufferedSinkManager`].
///
/// The normal path mutates the manager only from the single consumer thread,
/// but synchronous fallback lets producer threads write directly, so the
/// handle serializes all access behind one mutex. This path is not the hot
/// path.
pub struct SinkHandle {
    name: String,
    inner: Mutex<BufferedSinkManager>,
}

impl SinkHandle {
    pub fn new(manager: BufferedSinkManager) -> Self {
        Self {
            name: manager.name().to_string(),
            inner: Mutex::new(manager),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn startup(&self) -> Result<()> {
        self.inner.lock().startup()
    }

    pub fn shutdown(&self) -> Result<()> {
        self.inner.lock().shutdown()
    }

    pub fn write(&self, event: &LogEvent) -> Result<()> {
        self.inner.lock().write(event)
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    pub fn on_failover_event(&self, causal: &LogEvent) -> Vec<LogEvent> {
        self.inner.lock().on_failover_event(causal)
    }

    pub fn on_failover_exception(&self) -> Vec<LogEvent> {
        self.inner.lock().on_failover_exception()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().is_running()
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.lock().buffered_len()
    }
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHandle").field("name", &self.name).finish()
    }
}
