//! Overflow policies for the ordered transport
//!
//! When every transport slot is claimed, these policies determine how
//! producers handle new events to prevent silent log loss.

use super::level::Level;
use std::fmt;
use std::sync::Arc;

/// Policy applied when the transport ring is at capacity.
///
/// # Example
///
/// ```
/// use logpipe::core::{Level, OverflowPolicy};
///
/// // Default behavior: wait for a free slot
/// let policy = OverflowPolicy::default();
///
/// // Shed low-severity events under pressure
/// let policy = OverflowPolicy::DiscardBelow(Level::Warn);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Spin/yield with bounded backoff until a slot is freed.
    ///
    /// Preserves every event at the cost of backpressure on producers.
    Block,

    /// Silently drop events below the given level when saturated; events at
    /// or above it wait for a slot. Drops are counted, not reported per event.
    DiscardBelow(Level),

    /// Bypass the transport and dispatch on the producing thread when
    /// saturated. Delivery is preserved but that one event loses the
    /// asynchronous throughput benefit.
    SynchronousFallback,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::Block
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::DiscardBelow(level) => write!(f, "DiscardBelow({})", level),
            OverflowPolicy::SynchronousFallback => write!(f, "SynchronousFallback"),
        }
    }
}

/// Callback invoked when events are dropped under `DiscardBelow`.
///
/// The parameter is the total count of dropped events so far.
pub type DroppedEventCallback = Arc<dyn Fn(u64) + Send + Sync>;
