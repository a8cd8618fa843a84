//! Core pipeline types and traits

pub mod clock;
pub mod config_tree;
pub mod context;
pub mod error;
pub mod event_store;
pub mod level;
pub mod log_event;
pub mod metrics;
pub mod overflow;
pub mod ring;
pub mod sink;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config_tree::{ConfigTree, ConfigTreeBuilder, LoggerConfig, LoggerSpec};
pub use context::{
    ContextGuard, ContextProvider, ContextSnapshot, FixedContextProvider, ThreadContextProvider,
};
pub use error::{PipelineError, Result};
pub use event_store::{acquire, EventHandle, EventSlot};
pub use level::Level;
pub use log_event::{ErrorProxy, LogEvent, SourceLocation};
pub use metrics::PipelineMetrics;
pub use overflow::{DroppedEventCallback, OverflowPolicy};
pub use ring::{Claim, RingBuffer};
pub use sink::Sink;
