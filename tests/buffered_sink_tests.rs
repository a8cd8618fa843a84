//! Buffered sink manager contract tests
//!
//! Exercises the commit batching and failover hand-off rules end to end
//! against the in-memory sink: zero-size managers do one connect/write/commit
//! round-trip per event, sized managers batch exactly N writes per cycle,
//! and failed cycles leave every uncommitted event recoverable.

use logpipe::core::{Level, LogEvent, PipelineError};
use logpipe::sinks::{BufferedSinkManager, MemorySink};

fn event(message: &str) -> LogEvent {
    LogEvent {
        level: Level::Info,
        message: message.to_string(),
        ..LogEvent::default()
    }
}

#[test]
fn test_startup_shutdown_lifecycle() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 0);

    assert!(!manager.is_running());
    manager.startup().unwrap();
    assert!(manager.is_running());
    manager.shutdown().unwrap();
    assert!(!manager.is_running());
    // repeated shutdown is a no-op
    manager.shutdown().unwrap();

    assert_eq!(recorder.startups(), 1);
    assert_eq!(recorder.shutdowns(), 1);
}

#[test]
fn test_zero_buffer_commits_every_write() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 0);
    manager.startup().unwrap();

    for i in 0..3 {
        manager.write(&event(&format!("m{}", i))).unwrap();
    }

    assert_eq!(recorder.connects(), 3);
    assert_eq!(recorder.commits(), 3);
    assert_eq!(recorder.messages(), vec!["m0", "m1", "m2"]);
    assert_eq!(manager.buffered_len(), 0);
}

#[test]
fn test_sized_buffer_flushes_at_threshold() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 4);
    manager.startup().unwrap();

    for i in 0..3 {
        manager.write(&event(&format!("m{}", i))).unwrap();
    }
    // three buffered events, nothing durable yet
    assert_eq!(manager.buffered_len(), 3);
    assert_eq!(recorder.connects(), 0);
    assert_eq!(recorder.commits(), 0);

    manager.write(&event("m3")).unwrap();

    // the fourth write triggered one connect, four writes in order, one commit
    assert_eq!(recorder.connects(), 1);
    assert_eq!(recorder.commits(), 1);
    assert_eq!(recorder.messages(), vec!["m0", "m1", "m2", "m3"]);
    assert_eq!(manager.buffered_len(), 0);
}

#[test]
fn test_flush_below_threshold() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 10);
    manager.startup().unwrap();

    manager.write(&event("a")).unwrap();
    manager.write(&event("b")).unwrap();
    manager.flush().unwrap();

    assert_eq!(recorder.connects(), 1);
    assert_eq!(recorder.commits(), 1);
    assert_eq!(recorder.messages(), vec!["a", "b"]);
    assert_eq!(manager.buffered_len(), 0);
}

#[test]
fn test_flush_with_empty_buffer_is_a_no_op() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 10);
    manager.startup().unwrap();

    manager.flush().unwrap();
    assert_eq!(recorder.connects(), 0);
    assert_eq!(recorder.commits(), 0);
}

#[test]
fn test_connect_failure_propagates_to_write_caller() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 2);
    manager.startup().unwrap();

    manager.write(&event("a")).unwrap();
    recorder.fail_next_connect();
    let err = manager.write(&event("b")).unwrap_err();
    assert!(matches!(err, PipelineError::SinkError { .. }));

    // nothing became durable and nothing was lost
    assert_eq!(recorder.committed_len(), 0);
    assert_eq!(manager.buffered_len(), 2);
}

#[test]
fn test_failover_after_connect_failure_returns_causal_last() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 3);
    manager.startup().unwrap();

    manager.write(&event("a")).unwrap();
    manager.write(&event("b")).unwrap();
    recorder.fail_next_connect();
    let causal = event("c");
    assert!(manager.write(&causal).is_err());

    let handed_off = manager.on_failover_event(&causal);
    let messages: Vec<&str> = handed_off.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["a", "b", "c"]);
    // the causal event was already in the buffer, so it appears exactly once
    assert_eq!(manager.buffered_len(), 0);
}

#[test]
fn test_failover_appends_causal_when_missing() {
    let sink = MemorySink::new("mem");
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 10);
    manager.startup().unwrap();

    manager.write(&event("a")).unwrap();
    manager.write(&event("b")).unwrap();
    let causal = event("c");
    // causal was never buffered, e.g. zero-size write-through failure
    let handed_off = manager.on_failover_event(&causal);
    let messages: Vec<&str> = handed_off.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["a", "b", "c"]);
}

#[test]
fn test_failover_exception_returns_buffer_in_order() {
    let sink = MemorySink::new("mem");
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 10);
    manager.startup().unwrap();

    for i in 0..5 {
        manager.write(&event(&format!("m{}", i))).unwrap();
    }
    let handed_off = manager.on_failover_exception();
    let messages: Vec<&str> = handed_off.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["m0", "m1", "m2", "m3", "m4"]);
    assert_eq!(manager.buffered_len(), 0);
}

#[test]
fn test_failover_exception_with_empty_buffer() {
    let sink = MemorySink::new("mem");
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 10);
    manager.startup().unwrap();
    assert!(manager.on_failover_exception().is_empty());
}

#[test]
fn test_manager_is_clean_after_failover() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 2);
    manager.startup().unwrap();

    manager.write(&event("lost-to-failover")).unwrap();
    recorder.fail_next_connect();
    let causal = event("causal");
    assert!(manager.write(&causal).is_err());
    manager.on_failover_event(&causal);

    // after the hand-off the manager batches from scratch
    manager.write(&event("x")).unwrap();
    assert_eq!(recorder.committed_len(), 0);
    manager.write(&event("y")).unwrap();
    assert_eq!(recorder.messages(), vec!["x", "y"]);
}

#[test]
fn test_write_failure_keeps_buffer_recoverable() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 2);
    manager.startup().unwrap();

    manager.write(&event("a")).unwrap();
    recorder.fail_next_write();
    let causal = event("b");
    let err = manager.write(&causal).unwrap_err();
    assert!(matches!(err, PipelineError::SinkError { .. }));

    // the connect succeeded but the commit never happened, so both events
    // are still in the buffer for failover
    assert_eq!(recorder.committed_len(), 0);
    let handed_off = manager.on_failover_event(&causal);
    assert_eq!(handed_off.len(), 2);
}

#[test]
fn test_shutdown_flushes_remaining_events() {
    let sink = MemorySink::new("mem");
    let recorder = sink.recorder();
    let mut manager = BufferedSinkManager::new("mem", Box::new(sink), 100);
    manager.startup().unwrap();

    for i in 0..7 {
        manager.write(&event(&format!("m{}", i))).unwrap();
    }
    manager.shutdown().unwrap();

    assert_eq!(recorder.committed_len(), 7);
    assert_eq!(recorder.commits(), 1);
    assert_eq!(recorder.shutdowns(), 1);
}
