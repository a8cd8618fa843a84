//! Pipeline metrics for observability
//!
//! Counters for monitoring pipeline health: published and dropped events,
//! transport saturation, synchronous fallbacks, and sink failures.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for pipeline observability
///
/// # Example
///
/// ```
/// use logpipe::core::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
///
/// metrics.record_published();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.published_count(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Events successfully published into the transport
    published: AtomicU64,

    /// Events dropped by the discard overflow policy
    dropped: AtomicU64,

    /// Number of times a producer found the transport saturated
    saturation_events: AtomicU64,

    /// Events delivered synchronously on the producer thread
    sync_fallbacks: AtomicU64,

    /// Sink write failures observed during dispatch
    sink_errors: AtomicU64,
}

impl PipelineMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            saturation_events: AtomicU64::new(0),
            sync_fallbacks: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn saturation_events(&self) -> u64 {
        self.saturation_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sync_fallback_count(&self) -> u64 {
        self.sync_fallbacks.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_error_count(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    /// Record a published event, returning the previous count
    #[inline]
    pub fn record_published(&self) -> u64 {
        self.published.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped event, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a saturated-transport encounter
    #[inline]
    pub fn record_saturation(&self) -> u64 {
        self.saturation_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a synchronous fallback delivery
    #[inline]
    pub fn record_sync_fallback(&self) -> u64 {
        self.sync_fallbacks.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a sink failure during dispatch
    #[inline]
    pub fn record_sink_error(&self) -> u64 {
        self.sink_errors.fetch_add(1, Ordering::Relaxed)
    }

    /// Drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no events have been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.published_count() as f64 + self.sync_fallback_count() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.published.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.saturation_events.store(0, Ordering::Relaxed);
        self.sync_fallbacks.store(0, Ordering::Relaxed);
        self.sink_errors.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    /// Create a snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            published: AtomicU64::new(self.published_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            saturation_events: AtomicU64::new(self.saturation_events()),
            sync_fallbacks: AtomicU64::new(self.sync_fallback_count()),
            sink_errors: AtomicU64::new(self.sink_error_count()),
        }
    }
}
