//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. Each invocation
//! records the calling module path so dispatch can report where the event
//! originated.
//!
//! # Examples
//!
//! ```
//! use logpipe::prelude::*;
//! use logpipe::info;
//!
//! let mut pipeline = AsyncPipeline::builder().build().unwrap();
//! pipeline.start();
//!
//! // Basic logging
//! info!(pipeline, "server", "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(pipeline, "server", "Server listening on port {}", port);
//! ```

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use logpipe::prelude::*;
/// # let pipeline = AsyncPipeline::builder().build().unwrap();
/// use logpipe::log;
/// log!(pipeline, Level::Info, "app", "Simple message");
/// log!(pipeline, Level::Error, "app", "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($pipeline:expr, $level:expr, $logger:expr, $($arg:tt)+) => {
        $pipeline.log_with_caller(
            Some(module_path!()),
            $logger,
            None,
            $level,
            &format!($($arg)+),
            None,
        )
    };
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($pipeline:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::core::Level::Trace, $logger, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($pipeline:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::core::Level::Debug, $logger, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($pipeline:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::core::Level::Info, $logger, $($arg)+)
    };
}

/// Log a warn-level message.
#[macro_export]
macro_rules! warn {
    ($pipeline:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::core::Level::Warn, $logger, $($arg)+)
    };
}

/// Log an error-level message, optionally attaching a source error.
///
/// # Examples
///
/// ```
/// # use logpipe::prelude::*;
/// # let pipeline = AsyncPipeline::builder().build().unwrap();
/// use logpipe::error;
/// let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
/// error!(pipeline, "storage", "Write failed: {}", 42);
/// error!(pipeline, "storage", io_err; "Write failed");
/// ```
#[macro_export]
macro_rules! error {
    ($pipeline:expr, $logger:expr, $err:expr; $($arg:tt)+) => {
        $pipeline.log_with_caller(
            Some(module_path!()),
            $logger,
            None,
            $crate::core::Level::Error,
            &format!($($arg)+),
            Some(&$err),
        )
    };
    ($pipeline:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::core::Level::Error, $logger, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($pipeline:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($pipeline, $crate::core::Level::Fatal, $logger, $($arg)+)
    };
}
