//! Sink capability trait
//!
//! A sink is a destination that accepts events in connect/write/commit
//! cycles. The buffered sink manager is a decorator around this capability
//! set; it never reimplements destination logic itself.

use super::{error::Result, log_event::LogEvent};

pub trait Sink: Send {
    fn name(&self) -> &str;

    /// Whether the sink keeps its own internal buffer that only
    /// `commit_and_close` makes durable.
    fn is_buffered(&self) -> bool {
        false
    }

    /// One-time initialization at manager startup.
    fn startup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Final teardown at manager shutdown.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Open the destination for one write/commit round-trip.
    fn connect_and_start(&mut self) -> Result<()>;

    /// Write a single event. Durability is only guaranteed after
    /// `commit_and_close`.
    fn write_internal(&mut self, event: &LogEvent) -> Result<()>;

    /// Make every write since `connect_and_start` durable and close the
    /// round-trip.
    fn commit_and_close(&mut self) -> Result<()>;
}
