//! # Logpipe
//!
//! A production-ready, high-performance asynchronous logging pipeline with
//! recycled event slots, an ordered lock-free transport, and hierarchical
//! logger configuration.
//!
//! ## Features
//!
//! - **Garbage-Free Hot Path**: Per-thread event slots are recycled across
//!   log calls instead of allocated
//! - **Ordered Transport**: A fixed-capacity ring preserves publication
//!   order across producer threads, drained by a single consumer
//! - **Hierarchical Configuration**: Dotted logger names resolve against a
//!   tree of logger configs with level inheritance and additivity
//! - **Buffered Sinks**: Sinks batch writes per connection cycle and hand
//!   unflushed events to failover on connection errors
//! - **Thread Safe**: Designed for concurrent environments

pub mod core;
pub mod macros;
pub mod pipeline;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Claim, Clock, ConfigTree, ConfigTreeBuilder, ContextGuard, ContextProvider,
        ContextSnapshot, DroppedEventCallback, ErrorProxy, Level, LogEvent, LoggerConfig,
        LoggerSpec, ManualClock, OverflowPolicy, PipelineError, PipelineMetrics, Result,
        RingBuffer, Sink, SourceLocation, SystemClock, ThreadContextProvider,
    };
    pub use crate::pipeline::{AsyncPipeline, PipelineBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
    pub use crate::sinks::{BufferedSinkManager, SinkHandle, SinkRegistry, SinkSpec};
}

pub use self::core::{
    Claim, Clock, ConfigTree, ConfigTreeBuilder, ContextGuard, ContextProvider, ContextSnapshot,
    DroppedEventCallback, ErrorProxy, Level, LogEvent, LoggerConfig, LoggerSpec, ManualClock,
    OverflowPolicy, PipelineError, PipelineMetrics, Result, RingBuffer, Sink, SourceLocation,
    SystemClock, ThreadContextProvider,
};
pub use pipeline::{AsyncPipeline, PipelineBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
pub use sinks::{BufferedSinkManager, MemorySink, SinkHandle, SinkRegistry, SinkSpec};
