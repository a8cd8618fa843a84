//! Hierarchical logger configuration tree
//!
//! Logger names form a dot-separated namespace. A name resolves to the most
//! specific configured node by whole-segment prefix match, falling back to
//! the root. Each node carries an optional level (the effective level comes
//! from the nearest ancestor with one), an ordered list of sink references,
//! and an additivity flag that decides whether dispatch continues to the
//! parent's sinks.
//!
//! A tree is immutable once built. Reconfiguration builds a new tree and
//! swaps a single `Arc`; parent links are indices into the flat node array,
//! never back-pointers, so the whole tree moves as one unit. The generation
//! counter lets a dispatch pass prove it never mixes nodes from two trees.

use super::error::{PipelineError, Result};
use super::level::Level;
use crate::sinks::SinkHandle;
use std::collections::HashMap;
use std::sync::Arc;

/// One configured logger node.
#[derive(Debug)]
pub struct LoggerConfig {
    name: String,
    level: Option<Level>,
    additive: bool,
    include_location: bool,
    sink_ids: Vec<usize>,
    /// Index of the parent node; `None` only for the root.
    parent: Option<usize>,
}

impl LoggerConfig {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn additive(&self) -> bool {
        self.additive
    }

    pub fn include_location(&self) -> bool {
        self.include_location
    }
}

/// Immutable, atomically swappable configuration tree.
pub struct ConfigTree {
    generation: u64,
    nodes: Vec<LoggerConfig>,
    index: HashMap<String, usize>,
    sinks: Vec<Arc<SinkHandle>>,
}

/// Index of the root node.
const ROOT: usize = 0;

impl ConfigTree {
    pub fn builder() -> ConfigTreeBuilder {
        ConfigTreeBuilder::new()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn stamp_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Every sink handle owned by this tree, in registration order.
    pub fn sinks(&self) -> &[Arc<SinkHandle>] {
        &self.sinks
    }

    pub fn node(&self, idx: usize) -> &LoggerConfig {
        &self.nodes[idx]
    }

    /// Resolve a logger name to the most specific matching node.
    ///
    /// Matching is by whole dotted segments: `com.foobar` does not match a
    /// node named `com.foo`.
    pub fn resolve(&self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let mut prefix = name;
        while let Some(cut) = prefix.rfind('.') {
            prefix = &prefix[..cut];
            if let Some(&idx) = self.index.get(prefix) {
                return idx;
            }
        }
        ROOT
    }

    /// Effective level of a node: its own, or the nearest ancestor's.
    pub fn effective_level(&self, idx: usize) -> Level {
        let mut current = idx;
        loop {
            if let Some(level) = self.nodes[current].level {
                return level;
            }
            match self.nodes[current].parent {
                Some(parent) => current = parent,
                // the builder guarantees the root has a level
                None => return Level::Off,
            }
        }
    }

    /// Cheap producer-side check: would an event at `level` from `name`
    /// reach any dispatch at all?
    pub fn is_enabled(&self, name: &str, level: Level) -> bool {
        level.passes(self.effective_level(self.resolve(name)))
    }

    /// Whether the node resolved for `name` opts into source capture.
    pub fn location_enabled(&self, name: &str) -> bool {
        self.nodes[self.resolve(name)].include_location
    }

    /// The dispatch chain for a resolved node: the node itself, then each
    /// ancestor while the current node is additive, stopping at the first
    /// non-additive node or the root.
    pub fn additive_chain(&self, idx: usize) -> AdditiveChain<'_> {
        AdditiveChain {
            tree: self,
            next: Some(idx),
        }
    }

    /// Sink handles referenced by a node, in configuration order.
    pub fn sinks_of(&self, idx: usize) -> impl Iterator<Item = &Arc<SinkHandle>> {
        self.nodes[idx].sink_ids.iter().map(|&id| &self.sinks[id])
    }
}

impl std::fmt::Debug for ConfigTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigTree")
            .field("generation", &self.generation)
            .field("nodes", &self.nodes.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Iterator over the additive dispatch chain. Yields node indices.
pub struct AdditiveChain<'a> {
    tree: &'a ConfigTree,
    next: Option<usize>,
}

impl Iterator for AdditiveChain<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        let node = &self.tree.nodes[current];
        self.next = if node.additive { node.parent } else { None };
        Some(current)
    }
}

/// Specification of one logger node, consumed by [`ConfigTreeBuilder`].
#[derive(Debug, Clone)]
pub struct LoggerSpec {
    name: String,
    level: Option<Level>,
    additive: bool,
    include_location: bool,
    sinks: Vec<String>,
}

impl LoggerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            additive: true,
            include_location: false,
            sinks: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn additive(mut self, additive: bool) -> Self {
        self.additive = additive;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn include_location(mut self, include: bool) -> Self {
        self.include_location = include;
        self
    }

    /// Reference a sink registered on the builder, by name.
    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, name: impl Into<String>) -> Self {
        self.sinks.push(name.into());
        self
    }
}

/// Builds a [`ConfigTree`]. This is the configuration-loader boundary:
/// whatever parses a config file ends up driving this builder.
///
/// # Example
///
/// ```
/// use logpipe::core::{ConfigTree, Level, LoggerSpec};
/// use logpipe::sinks::{BufferedSinkManager, MemorySink, SinkHandle};
///
/// let sink = MemorySink::new("mem");
/// let manager = BufferedSinkManager::new("mem", Box::new(sink), 0);
/// let tree = ConfigTree::builder()
///     .sink(SinkHandle::new(manager))
///     .root(Level::Info, ["mem"])
///     .logger(LoggerSpec::new("db").level(Level::Debug).sink("mem"))
///     .build()
///     .unwrap();
///
/// assert!(tree.is_enabled("db.pool", Level::Debug));
/// assert!(!tree.is_enabled("web", Level::Debug));
/// ```
pub struct ConfigTreeBuilder {
    sinks: Vec<Arc<SinkHandle>>,
    root_level: Level,
    root_sinks: Vec<String>,
    loggers: Vec<LoggerSpec>,
}

impl ConfigTreeBuilder {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            root_level: Level::Info,
            root_sinks: Vec::new(),
            loggers: Vec::new(),
        }
    }

    /// Register a sink handle under its manager name.
    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, handle: SinkHandle) -> Self {
        self.sinks.push(Arc::new(handle));
        self
    }

    /// Register an already shared sink handle, e.g. one carried over from a
    /// previous tree so its buffered state survives reconfiguration.
    #[must_use = "builder methods return a new value"]
    pub fn shared_sink(mut self, handle: Arc<SinkHandle>) -> Self {
        self.sinks.push(handle);
        self
    }

    /// Configure the root: its level (the default effective level for every
    /// logger without a more specific ancestor) and its sinks.
    #[must_use = "builder methods return a new value"]
    pub fn root<I, S>(mut self, level: Level, sinks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.root_level = level;
        self.root_sinks = sinks.into_iter().map(Into::into).collect();
        self
    }

    /// Add a named logger node.
    #[must_use = "builder methods return a new value"]
    pub fn logger(mut self, spec: LoggerSpec) -> Self {
        self.loggers.push(spec);
        self
    }

    pub fn build(self) -> Result<ConfigTree> {
        let mut sink_index: HashMap<String, usize> = HashMap::new();
        for (id, handle) in self.sinks.iter().enumerate() {
            if sink_index.insert(handle.name().to_string(), id).is_some() {
                return Err(PipelineError::config(
                    "ConfigTree",
                    format!("duplicate sink name '{}'", handle.name()),
                ));
            }
        }
        let resolve_sinks = |names: &[String]| -> Result<Vec<usize>> {
            names
                .iter()
                .map(|name| {
                    sink_index.get(name).copied().ok_or_else(|| {
                        PipelineError::config(
                            "ConfigTree",
                            format!("logger references unknown sink '{}'", name),
                        )
                    })
                })
                .collect()
        };

        let mut nodes = Vec::with_capacity(self.loggers.len() + 1);
        let mut index: HashMap<String, usize> = HashMap::new();
        nodes.push(LoggerConfig {
            name: String::new(),
            level: Some(self.root_level),
            additive: false,
            include_location: false,
            sink_ids: resolve_sinks(&self.root_sinks)?,
            parent: None,
        });
        index.insert(String::new(), ROOT);

        for spec in &self.loggers {
            if spec.name.is_empty() {
                return Err(PipelineError::config(
                    "ConfigTree",
                    "logger name must not be empty; configure the root via root()",
                ));
            }
            let idx = nodes.len();
            if index.insert(spec.name.clone(), idx).is_some() {
                return Err(PipelineError::config(
                    "ConfigTree",
                    format!("duplicate logger name '{}'", spec.name),
                ));
            }
            nodes.push(LoggerConfig {
                name: spec.name.clone(),
                level: spec.level,
                additive: spec.additive,
                include_location: spec.include_location,
                sink_ids: resolve_sinks(&spec.sinks)?,
                parent: None, // fixed up below, once every node is known
            });
        }

        for idx in 1..nodes.len() {
            let mut prefix = nodes[idx].name.as_str();
            let mut parent = ROOT;
            while let Some(cut) = prefix.rfind('.') {
                prefix = &prefix[..cut];
                if let Some(&candidate) = index.get(prefix) {
                    parent = candidate;
                    break;
                }
            }
            nodes[idx].parent = Some(parent);
        }

        Ok(ConfigTree {
            generation: 0,
            nodes,
            index,
            sinks: self.sinks,
        })
    }
}

impl Default for ConfigTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
