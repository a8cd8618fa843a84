//! Static sink registry
//!
//! Maps a sink kind identifier to a constructor function, resolved once at
//! configuration-build time. Dispatch never performs dynamic lookup; by the
//! time a tree is installed, every sink reference is a plain index.

use super::buffered::BufferedSinkManager;
use crate::core::{PipelineError, Result, Sink};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declarative description of one sink, as a configuration loader would
/// produce it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSpec {
    /// Registry kind identifier, e.g. `"console"`, `"file"`, `"memory"`.
    pub kind: String,
    /// Unique manager name, referenced by logger nodes.
    pub name: String,
    /// Commit-batching threshold; 0 means fully synchronous writes.
    #[serde(default)]
    pub buffer_size: usize,
    /// Kind-specific parameters, e.g. `path` for the file sink.
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkSpec {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            buffer_size: 0,
            params: HashMap::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Constructor for one sink kind.
pub type SinkConstructor = fn(&SinkSpec) -> Result<Box<dyn Sink>>;

/// Registry of sink constructors, keyed by kind.
pub struct SinkRegistry {
    constructors: HashMap<&'static str, SinkConstructor>,
}

impl SinkRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in sink kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("memory", |spec| {
            Ok(Box::new(super::memory::MemorySink::new(&spec.name)))
        });
        #[cfg(feature = "console")]
        registry.register("console", |spec| {
            let colors = spec
                .params
                .get("colors")
                .map(|v| v == "true")
                .unwrap_or(true);
            Ok(Box::new(
                super::console::ConsoleSink::new(&spec.name).with_colors(colors),
            ))
        });
        #[cfg(feature = "file")]
        registry.register("file", |spec| {
            let path = spec.params.get("path").ok_or_else(|| {
                PipelineError::config("file sink", "missing required parameter 'path'")
            })?;
            Ok(Box::new(super::file::FileSink::new(&spec.name, path)))
        });
        registry
    }

    /// Register (or replace) a constructor for `kind`.
    pub fn register(&mut self, kind: &'static str, constructor: SinkConstructor) {
        self.constructors.insert(kind, constructor);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Build a managed sink from its spec.
    pub fn build(&self, spec: &SinkSpec) -> Result<BufferedSinkManager> {
        let constructor = self
            .constructors
            .get(spec.kind.as_str())
            .ok_or_else(|| PipelineError::unknown_kind(&spec.kind))?;
        let sink = constructor(spec)?;
        Ok(BufferedSinkManager::new(&spec.name, sink, spec.buffer_size))
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
