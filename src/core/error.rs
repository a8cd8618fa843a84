//! Error types for the logging pipeline

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Sink connect/write/commit failure
    #[error("Sink '{name}' failed: {message}")]
    SinkError { name: String, message: String },

    /// Write attempted against a stopped sink manager
    #[error("Sink manager '{name}' is stopped")]
    SinkStopped { name: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Sink kind not present in the registry
    #[error("Unknown sink kind: '{kind}'")]
    UnknownSinkKind { kind: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PipelineError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a sink failure error
    pub fn sink(name: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::SinkError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a stopped-sink error
    pub fn sink_stopped(name: impl Into<String>) -> Self {
        PipelineError::SinkStopped { name: name.into() }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-sink-kind error
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        PipelineError::UnknownSinkKind { kind: kind.into() }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PipelineError::Other(msg.into())
    }
}
