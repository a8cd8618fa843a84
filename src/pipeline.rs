//! Asynchronous pipeline: producers, ordered transport, consumer, dispatch
//!
//! `AsyncPipeline` is the fire-and-forget entry point for application
//! threads. A log call fills the calling thread's recycled event slot,
//! checks the configuration tree's effective level, then publishes the event
//! into the ring. One dedicated consumer thread drains the ring in delivery
//! order and dispatches each event to the sinks resolved from the tree,
//! walking ancestors while additive. Sink failures on the consumer are
//! isolated per sink and reported to stderr, never thrown back into
//! application code.

use crate::core::config_tree::ConfigTree;
use crate::core::context::{ContextProvider, ThreadContextProvider};
use crate::core::error::{PipelineError, Result};
use crate::core::event_store;
use crate::core::level::Level;
use crate::core::log_event::{ErrorProxy, LogEvent, SourceLocation};
use crate::core::metrics::PipelineMetrics;
use crate::core::overflow::{DroppedEventCallback, OverflowPolicy};
use crate::core::ring::{Claim, RingBuffer};
use crate::core::{Clock, SystemClock};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout used when the pipeline is dropped without an
/// explicit `stop()`.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How often drops must recur before the dropped-event callback fires again.
const DROP_ALERT_INTERVAL: u64 = 1000;

enum Control {
    Flush(Sender<Result<()>>),
    Stop,
}

struct Shared {
    ring: RingBuffer,
    tree: RwLock<Arc<ConfigTree>>,
    metrics: PipelineMetrics,
    policy: OverflowPolicy,
    clock: Arc<dyn Clock>,
    context: Arc<dyn ContextProvider>,
    on_dropped: Option<DroppedEventCallback>,
    running: AtomicBool,
}

pub struct AsyncPipeline {
    shared: Arc<Shared>,
    control: Option<Sender<Control>>,
    consumer: Option<thread::JoinHandle<()>>,
}

impl AsyncPipeline {
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Spawn the consumer thread and start every sink of the current tree.
    ///
    /// Idempotent while running. Returns `false` if the pipeline has already
    /// been stopped (a stopped pipeline cannot restart) or if the thread
    /// could not be spawned.
    pub fn start(&mut self) -> bool {
        if self.consumer.is_some() {
            return true;
        }
        if self.shared.ring.stop_requested() {
            eprintln!("[LOGPIPE WARNING] start() after stop() is not supported");
            return false;
        }
        for sink in self.shared.tree.read().sinks() {
            if let Err(e) = sink.startup() {
                eprintln!("[LOGPIPE ERROR] sink '{}' failed to start: {}", sink.name(), e);
            }
        }
        let (control_tx, control_rx) = bounded::<Control>(16);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("logpipe-consumer".to_string())
            .spawn(move || Self::consume_loop(&shared, &control_rx));
        match spawned {
            Ok(handle) => {
                self.shared.running.store(true, Ordering::Release);
                self.control = Some(control_tx);
                self.consumer = Some(handle);
                true
            }
            Err(e) => {
                eprintln!("[LOGPIPE ERROR] failed to spawn consumer thread: {}", e);
                false
            }
        }
    }

    fn consume_loop(shared: &Shared, control: &Receiver<Control>) {
        loop {
            let drained = shared.ring.drain(|event| Self::dispatch(shared, event));
            if drained > 0 {
                continue;
            }
            match control.recv_timeout(Duration::from_millis(1)) {
                Ok(Control::Flush(ack)) => {
                    shared.ring.drain(|event| Self::dispatch(shared, event));
                    let _ = ack.send(Self::flush_sinks(shared));
                }
                Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    // drain every claimed event before terminating; stop has
                    // already been requested so the claim cursor is frozen
                    loop {
                        let n = shared.ring.drain(|event| Self::dispatch(shared, event));
                        if n == 0 {
                            if shared.ring.is_idle() {
                                break;
                            }
                            thread::yield_now();
                        }
                    }
                    if let Err(e) = Self::flush_sinks(shared) {
                        eprintln!("[LOGPIPE ERROR] flush during shutdown failed: {}", e);
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    /// Deliver one event to every sink its logger resolves to, walking the
    /// additive chain. One tree generation is used for the whole dispatch.
    fn dispatch(shared: &Shared, event: &LogEvent) {
        let tree = shared.tree.read().clone();
        let idx = tree.resolve(&event.logger_name);
        // re-check the level: configuration may have changed between the
        // producer-side check and now
        if !event.level.passes(tree.effective_level(idx)) {
            return;
        }
        for node_idx in tree.additive_chain(idx) {
            for sink in tree.sinks_of(node_idx) {
                // a failing sink must not starve the others
                if let Err(e) = sink.write(event) {
                    shared.metrics.record_sink_error();
                    eprintln!("[LOGPIPE ERROR] sink '{}' failed: {}", sink.name(), e);
                }
            }
        }
    }

    fn flush_sinks(shared: &Shared) -> Result<()> {
        let tree = shared.tree.read().clone();
        let mut first_error = None;
        for sink in tree.sinks() {
            if let Err(e) = sink.flush() {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Fire-and-forget log call.
    ///
    /// Never blocks except under the `Block` overflow policy and never
    /// propagates sink failures, except on the synchronous paths (zero
    /// buffer or fallback) where delivery happens on this thread and
    /// failures are still only reported, not thrown.
    #[track_caller]
    pub fn log(
        &self,
        logger: &str,
        marker: Option<&str>,
        level: Level,
        message: &str,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) {
        self.log_with_caller(None, logger, marker, level, message, error);
    }

    /// Variant used by the logging macros, carrying the origin module path.
    #[track_caller]
    pub fn log_with_caller(
        &self,
        caller: Option<&str>,
        logger: &str,
        marker: Option<&str>,
        level: Level,
        message: &str,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) {
        let location = std::panic::Location::caller();
        let shared = &self.shared;

        // cheap producer-side filter: skip building the event entirely
        let include_location = {
            let tree = shared.tree.read().clone();
            if !tree.is_enabled(logger, level) {
                return;
            }
            tree.location_enabled(logger)
        };

        let handle = event_store::acquire();
        {
            let mut event = handle.event_mut();
            // the slot was cleared on release, so in-place appends suffice
            event.logger_name.push_str(logger);
            event.marker = marker.map(str::to_string);
            event.caller = caller.map(str::to_string);
            event.level = level;
            LogEvent::push_sanitized(&mut event.message, message);
            let snapshot = shared.context.snapshot();
            event.context_map = snapshot.map;
            event.context_stack = snapshot.stack;
            event.time_millis = shared.clock.now_millis();
            event.nano_time = shared.clock.nano_time();
            if include_location {
                event.source = Some(SourceLocation::from_caller(location));
            }
            event.error = error.map(ErrorProxy::capture);
            event.end_of_batch = false;
        }

        match shared.ring.try_claim(level, shared.policy, || {
            shared.metrics.record_saturation();
        }) {
            Claim::Granted(seq) => {
                let event = handle.event();
                shared.ring.publish(seq, |slot| slot.clone_from(&event));
                shared.metrics.record_published();
            }
            Claim::Discard => {
                let dropped = shared.metrics.record_dropped() + 1;
                if let Some(callback) = &shared.on_dropped {
                    // alert on the first drop and periodically thereafter
                    if dropped == 1 || dropped % DROP_ALERT_INTERVAL == 0 {
                        callback(dropped);
                    }
                }
            }
            Claim::Synchronous => {
                shared.metrics.record_sync_fallback();
                let event = handle.event();
                Self::dispatch(shared, &event);
            }
        }
    }

    #[track_caller]
    pub fn trace(&self, logger: &str, message: &str) {
        self.log(logger, None, Level::Trace, message, None);
    }

    #[track_caller]
    pub fn debug(&self, logger: &str, message: &str) {
        self.log(logger, None, Level::Debug, message, None);
    }

    #[track_caller]
    pub fn info(&self, logger: &str, message: &str) {
        self.log(logger, None, Level::Info, message, None);
    }

    #[track_caller]
    pub fn warn(&self, logger: &str, message: &str) {
        self.log(logger, None, Level::Warn, message, None);
    }

    #[track_caller]
    pub fn error(&self, logger: &str, message: &str) {
        self.log(logger, None, Level::Error, message, None);
    }

    #[track_caller]
    pub fn fatal(&self, logger: &str, message: &str) {
        self.log(logger, None, Level::Fatal, message, None);
    }

    /// Drain everything published so far and force-commit every sink.
    ///
    /// Returns the first sink failure encountered while flushing, after
    /// every sink has been attempted.
    pub fn flush(&self) -> Result<()> {
        if let Some(control) = &self.control {
            let (ack_tx, ack_rx) = bounded(1);
            if control.send(Control::Flush(ack_tx)).is_ok() {
                return match ack_rx.recv_timeout(Duration::from_secs(5)) {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::other("flush acknowledgement timed out")),
                };
            }
        }
        Self::flush_sinks(&self.shared)
    }

    /// Gracefully stop: reject new claims, drain every published event,
    /// flush and shut down the sinks. Bounded by `timeout`.
    ///
    /// Returns `true` if the consumer finished draining within the timeout.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.shared.ring.request_stop();
        self.shared.running.store(false, Ordering::Release);
        if let Some(control) = self.control.take() {
            let _ = control.send(Control::Stop);
        }
        let Some(handle) = self.consumer.take() else {
            return true;
        };
        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!(
                        "[LOGPIPE ERROR] consumer thread panicked during shutdown: {:?}",
                        e
                    );
                    return false;
                }
                break;
            }
            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGPIPE WARNING] consumer thread did not finish within {:?} timeout. \
                     Some events may be lost.",
                    timeout
                );
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        for sink in self.shared.tree.read().sinks() {
            if let Err(e) = sink.shutdown() {
                eprintln!("[LOGPIPE ERROR] sink '{}' failed to shut down: {}", sink.name(), e);
            }
        }
        true
    }

    /// Atomically install a new configuration tree.
    ///
    /// The new tree gets the next generation number; dispatches already in
    /// flight keep using the tree they resolved at dispatch start. Sink
    /// handles carried over via `shared_sink` keep their buffered state;
    /// handles NOT carried over are shut down, which flushes whatever their
    /// managers still hold buffered. A dispatch racing the swap may see a
    /// retired sink reject its write; that failure is reported, not thrown.
    pub fn reconfigure(&self, mut tree: ConfigTree) {
        if self.shared.running.load(Ordering::Acquire) {
            for sink in tree.sinks() {
                if let Err(e) = sink.startup() {
                    eprintln!("[LOGPIPE ERROR] sink '{}' failed to start: {}", sink.name(), e);
                }
            }
        }
        let outgoing = {
            let mut guard = self.shared.tree.write();
            tree.stamp_generation(guard.generation() + 1);
            std::mem::replace(&mut *guard, Arc::new(tree))
        };
        let current = self.shared.tree.read().clone();
        for sink in outgoing.sinks() {
            if current.sinks().iter().any(|kept| Arc::ptr_eq(kept, sink)) {
                continue;
            }
            if let Err(e) = sink.shutdown() {
                eprintln!("[LOGPIPE ERROR] sink '{}' failed to shut down: {}", sink.name(), e);
            }
        }
    }

    /// The currently installed tree.
    pub fn current_tree(&self) -> Arc<ConfigTree> {
        self.shared.tree.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.shared.tree.read().generation()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.shared.metrics
    }

    /// Events dropped by the discard overflow policy.
    pub fn dropped_count(&self) -> u64 {
        self.shared.metrics.dropped_count()
    }
}

impl Drop for AsyncPipeline {
    fn drop(&mut self) {
        if self.consumer.is_some() {
            self.stop(DEFAULT_SHUTDOWN_TIMEOUT);
        }
        let dropped = self.shared.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGPIPE WARNING] pipeline shutting down with {} dropped events (drop rate: {:.2}%)",
                dropped,
                self.shared.metrics.drop_rate()
            );
        }
    }
}

/// Builder for [`AsyncPipeline`] with a fluent API
///
/// # Example
/// ```
/// use logpipe::pipeline::AsyncPipeline;
/// use logpipe::core::{ConfigTree, Level, OverflowPolicy};
/// use logpipe::sinks::{BufferedSinkManager, MemorySink, SinkHandle};
///
/// let sink = MemorySink::new("mem");
/// let tree = ConfigTree::builder()
///     .sink(SinkHandle::new(BufferedSinkManager::new("mem", Box::new(sink), 0)))
///     .root(Level::Info, ["mem"])
///     .build()
///     .unwrap();
///
/// let mut pipeline = AsyncPipeline::builder()
///     .capacity(1024)
///     .overflow_policy(OverflowPolicy::Block)
///     .tree(tree)
///     .build()
///     .unwrap();
/// pipeline.start();
/// pipeline.info("app", "pipeline is up");
/// ```
pub struct PipelineBuilder {
    capacity: usize,
    policy: OverflowPolicy,
    clock: Arc<dyn Clock>,
    context: Arc<dyn ContextProvider>,
    on_dropped: Option<DroppedEventCallback>,
    tree: Option<ConfigTree>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            capacity: 1024,
            policy: OverflowPolicy::default(),
            clock: Arc::new(SystemClock),
            context: Arc::new(ThreadContextProvider),
            on_dropped: None,
            tree: None,
        }
    }

    /// Transport capacity in slots; rounded up to a power of two.
    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Policy applied when the transport is saturated.
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Inject a clock, e.g. a `ManualClock` for deterministic tests.
    #[must_use = "builder methods return a new value"]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Inject a context provider; defaults to the thread-local context.
    #[must_use = "builder methods return a new value"]
    pub fn context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context = provider;
        self
    }

    /// Callback invoked when events are dropped by the discard policy.
    #[must_use = "builder methods return a new value"]
    pub fn on_dropped(mut self, callback: DroppedEventCallback) -> Self {
        self.on_dropped = Some(callback);
        self
    }

    /// Initial configuration tree. Without one, every event resolves to an
    /// empty root at `Info`.
    #[must_use = "builder methods return a new value"]
    pub fn tree(mut self, tree: ConfigTree) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn build(self) -> Result<AsyncPipeline> {
        let tree = match self.tree {
            Some(tree) => tree,
            None => ConfigTree::builder().build()?,
        };
        Ok(AsyncPipeline {
            shared: Arc::new(Shared {
                ring: RingBuffer::with_capacity(self.capacity),
                tree: RwLock::new(Arc::new(tree)),
                metrics: PipelineMetrics::new(),
                policy: self.policy,
                clock: self.clock,
                context: self.context,
                on_dropped: self.on_dropped,
                running: AtomicBool::new(false),
            }),
            control: None,
            consumer: None,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_tree::LoggerSpec;
    use crate::sinks::{BufferedSinkManager, MemoryRecorder, MemorySink, SinkHandle};

    fn memory_tree(buffer_size: usize) -> (ConfigTree, MemoryRecorder) {
        let sink = MemorySink::new("mem");
        let recorder = sink.recorder();
        let tree = ConfigTree::builder()
            .sink(SinkHandle::new(BufferedSinkManager::new(
                "mem",
                Box::new(sink),
                buffer_size,
            )))
            .root(Level::Trace, ["mem"])
            .build()
            .unwrap();
        (tree, recorder)
    }

    #[test]
    fn test_log_flush_delivers_in_order() {
        let (tree, recorder) = memory_tree(0);
        let mut pipeline = AsyncPipeline::builder().tree(tree).build().unwrap();
        assert!(pipeline.start());

        for i in 0..10 {
            pipeline.info("app", &format!("message {}", i));
        }
        pipeline.flush().unwrap();

        let messages = recorder.messages();
        assert_eq!(messages.len(), 10);
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message, &format!("message {}", i));
        }
        assert!(pipeline.stop(Duration::from_secs(5)));
    }

    #[test]
    fn test_producer_side_level_filter() {
        let sink = MemorySink::new("mem");
        let recorder = sink.recorder();
        let tree = ConfigTree::builder()
            .sink(SinkHandle::new(BufferedSinkManager::new(
                "mem",
                Box::new(sink),
                0,
            )))
            .root(Level::Warn, ["mem"])
            .build()
            .unwrap();
        let mut pipeline = AsyncPipeline::builder().tree(tree).build().unwrap();
        pipeline.start();

        pipeline.debug("app", "filtered out");
        pipeline.warn("app", "kept");
        pipeline.flush().unwrap();

        assert_eq!(recorder.messages(), vec!["kept"]);
        // the filtered event never entered the transport
        assert_eq!(pipeline.metrics().published_count(), 1);
        pipeline.stop(Duration::from_secs(5));
    }

    #[test]
    fn test_stop_drains_pending_events() {
        let (tree, recorder) = memory_tree(0);
        let mut pipeline = AsyncPipeline::builder().tree(tree).build().unwrap();
        pipeline.start();

        for i in 0..50 {
            pipeline.info("app", &format!("m{}", i));
        }
        assert!(pipeline.stop(Duration::from_secs(5)));
        assert_eq!(recorder.messages().len(), 50);
    }

    #[test]
    fn test_log_after_stop_is_synchronous() {
        let (tree, recorder) = memory_tree(0);
        let mut pipeline = AsyncPipeline::builder().tree(tree).build().unwrap();
        pipeline.start();
        assert!(pipeline.stop(Duration::from_secs(5)));

        // sinks are shut down, so delivery fails, but the call must not panic
        // and must be counted as a synchronous fallback
        pipeline.info("app", "too late");
        assert_eq!(pipeline.metrics().sync_fallback_count(), 1);
        assert_eq!(recorder.messages().len(), 0);
    }

    #[test]
    fn test_reconfigure_bumps_generation() {
        let (tree, _recorder) = memory_tree(0);
        let mut pipeline = AsyncPipeline::builder().tree(tree).build().unwrap();
        pipeline.start();
        assert_eq!(pipeline.generation(), 0);

        let (tree2, recorder2) = memory_tree(0);
        pipeline.reconfigure(tree2);
        assert_eq!(pipeline.generation(), 1);

        pipeline.info("app", "after swap");
        pipeline.flush().unwrap();
        assert_eq!(recorder2.messages(), vec!["after swap"]);
        pipeline.stop(Duration::from_secs(5));
    }

    #[test]
    fn test_dispatch_redundant_filter_respects_new_tree() {
        let (tree, recorder) = memory_tree(0);
        let pipeline = AsyncPipeline::builder().tree(tree).build().unwrap();
        // not started: dispatch directly to exercise the consumer-side filter
        let shared = &pipeline.shared;
        shared.tree.read().sinks()[0].startup().unwrap();

        let event = LogEvent {
            logger_name: "app".to_string(),
            level: Level::Debug,
            message: "x".to_string(),
            ..LogEvent::default()
        };
        AsyncPipeline::dispatch(shared, &event);
        assert_eq!(recorder.messages().len(), 1);

        // raise the root level and dispatch the same event again
        let strict_tree = ConfigTree::builder()
            .sink(SinkHandle::new(BufferedSinkManager::new(
                "mem",
                Box::new(MemorySink::new("mem")),
                0,
            )))
            .root(Level::Error, ["mem"])
            .build()
            .unwrap();
        pipeline.reconfigure(strict_tree);
        AsyncPipeline::dispatch(shared, &event);
        // still one delivery: the new tree filters Debug out
        assert_eq!(recorder.messages().len(), 1);
    }

    #[test]
    fn test_logger_spec_routing() {
        let audit_sink = MemorySink::new("audit");
        let audit_recorder = audit_sink.recorder();
        let root_sink = MemorySink::new("root");
        let root_recorder = root_sink.recorder();
        let tree = ConfigTree::builder()
            .sink(SinkHandle::new(BufferedSinkManager::new(
                "audit",
                Box::new(audit_sink),
                0,
            )))
            .sink(SinkHandle::new(BufferedSinkManager::new(
                "root",
                Box::new(root_sink),
                0,
            )))
            .root(Level::Info, ["root"])
            .logger(
                LoggerSpec::new("audit")
                    .level(Level::Trace)
                    .additive(false)
                    .sink("audit"),
            )
            .build()
            .unwrap();
        let mut pipeline = AsyncPipeline::builder().tree(tree).build().unwrap();
        pipeline.start();

        pipeline.trace("audit.payments", "audit only");
        pipeline.info("web", "root only");
        pipeline.flush().unwrap();

        assert_eq!(audit_recorder.messages(), vec!["audit only"]);
        assert_eq!(root_recorder.messages(), vec!["root only"]);
        pipeline.stop(Duration::from_secs(5));
    }
}
