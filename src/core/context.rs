//! Thread context map and stack
//!
//! This module provides:
//! - Thread-local key-value context (`put`/`get`/`remove`/`clear_map`)
//! - Thread-local nested diagnostic stack (`push`/`pop`/`clear_stack`)
//! - `ContextSnapshot`: an owned copy captured into each log event
//! - `ContextGuard`: RAII guard that pops a pushed stack entry on drop
//!
//! The pipeline never reads the thread-locals directly; it goes through a
//! [`ContextProvider`] so tests can inject a fixed context.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static CONTEXT_MAP: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
    static CONTEXT_STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Put a key-value pair into the calling thread's context map.
pub fn put(key: impl Into<String>, value: impl Into<String>) {
    CONTEXT_MAP.with(|map| {
        map.borrow_mut().insert(key.into(), value.into());
    });
}

/// Get a value from the calling thread's context map.
pub fn get(key: &str) -> Option<String> {
    CONTEXT_MAP.with(|map| map.borrow().get(key).cloned())
}

/// Remove a key from the calling thread's context map.
pub fn remove(key: &str) -> Option<String> {
    CONTEXT_MAP.with(|map| map.borrow_mut().remove(key))
}

/// Clear the calling thread's context map.
pub fn clear_map() {
    CONTEXT_MAP.with(|map| map.borrow_mut().clear());
}

/// Push an entry onto the calling thread's context stack.
pub fn push(entry: impl Into<String>) {
    CONTEXT_STACK.with(|stack| stack.borrow_mut().push(entry.into()));
}

/// Pop the most recent entry from the calling thread's context stack.
pub fn pop() -> Option<String> {
    CONTEXT_STACK.with(|stack| stack.borrow_mut().pop())
}

/// Current depth of the calling thread's context stack.
pub fn depth() -> usize {
    CONTEXT_STACK.with(|stack| stack.borrow().len())
}

/// Clear the calling thread's context stack.
pub fn clear_stack() {
    CONTEXT_STACK.with(|stack| stack.borrow_mut().clear());
}

/// Push an entry and get a guard that pops it when dropped.
///
/// # Example
///
/// ```
/// use logpipe::core::context;
///
/// {
///     let _guard = context::push_scoped("request-42");
///     assert_eq!(context::depth(), 1);
/// }
/// assert_eq!(context::depth(), 0);
/// ```
#[must_use = "the entry is popped when the guard is dropped"]
pub fn push_scoped(entry: impl Into<String>) -> ContextGuard {
    push(entry);
    ContextGuard { _private: () }
}

/// RAII guard returned by [`push_scoped`].
pub struct ContextGuard {
    _private: (),
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        pop();
    }
}

/// Owned copy of a thread's context, captured at event-fill time.
///
/// Holds no references back into thread-local storage; once captured it is
/// safe to hand to the consumer thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub map: HashMap<String, String>,
    /// Most-recent-last.
    pub stack: Vec<String>,
}

/// Supplies the calling thread's context to the pipeline.
pub trait ContextProvider: Send + Sync {
    fn snapshot(&self) -> ContextSnapshot;
}

/// Default provider reading this module's thread-locals.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadContextProvider;

impl ContextProvider for ThreadContextProvider {
    fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            map: CONTEXT_MAP.with(|map| map.borrow().clone()),
            stack: CONTEXT_STACK.with(|stack| stack.borrow().clone()),
        }
    }
}

/// Provider returning a fixed snapshot, for deterministic tests.
#[derive(Debug, Default, Clone)]
pub struct FixedContextProvider {
    snapshot: ContextSnapshot,
}

impl FixedContextProvider {
    pub fn new(snapshot: ContextSnapshot) -> Self {
        Self { snapshot }
    }
}

impl ContextProvider for FixedContextProvider {
    fn snapshot(&self) -> ContextSnapshot {
        self.snapshot.clone()
    }
}
