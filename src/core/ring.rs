//! Ordered transport: a fixed-capacity ring of preallocated event slots
//!
//! Producers claim monotonically increasing sequence numbers with a CAS loop,
//! fill the slot the sequence maps to, then publish. Publication advances a
//! single `published` cursor strictly in sequence order: a producer whose
//! lower neighbours have not published yet spins with bounded backoff, so the
//! consumer always observes a gap-free prefix. The consumer drains every
//! newly published slot in sequence order and advances the `consumed` cursor,
//! which frees those slots for reuse by later claims (ring wraparound, never
//! freed).
//!
//! Ordering guarantees: events from one producer thread are delivered in call
//! order; across threads, delivery order equals claim order.

use super::level::Level;
use super::log_event::LogEvent;
use super::overflow::OverflowPolicy;
use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Outcome of a claim attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Claim {
    /// Sequence claimed; the caller must fill and publish it.
    Granted(u64),
    /// Transport saturated and the event's level is below the discard
    /// threshold; the caller drops it (counted, not delivered).
    Discard,
    /// The caller must dispatch the event itself on its own thread, either
    /// because the transport is saturated under `SynchronousFallback` or
    /// because stop has been requested.
    Synchronous,
}

struct Slot(UnsafeCell<LogEvent>);

/// Fixed-capacity circular buffer shared by all producers, drained by one
/// consumer.
pub struct RingBuffer {
    slots: Box<[Slot]>,
    mask: u64,
    /// Next unclaimed sequence.
    claim: CachePadded<AtomicU64>,
    /// Sequences below this are visible to the consumer.
    published: CachePadded<AtomicU64>,
    /// Sequences below this have been fully consumed; their slots are free.
    consumed: CachePadded<AtomicU64>,
    stopping: AtomicBool,
    /// Guards against two threads draining at once.
    draining: AtomicBool,
}

// SAFETY: a slot is touched by exactly one thread at a time. Between claim
// and publish only the claiming producer may access it (the capacity check
// against `consumed` keeps the consumer and other producers out); between
// publish and consume only the consumer may (Release store on `published`,
// Acquire load in `drain`); after `consumed` advances past it, only the next
// claiming producer.
unsafe impl Sync for RingBuffer {}
unsafe impl Send for RingBuffer {}

impl RingBuffer {
    /// Create a ring with at least `capacity` slots, rounded up to the next
    /// power of two for cheap sequence-to-slot mapping.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let slots: Box<[Slot]> = (0..capacity)
            .map(|_| Slot(UnsafeCell::new(LogEvent::default())))
            .collect();
        Self {
            slots,
            mask: (capacity - 1) as u64,
            claim: CachePadded::new(AtomicU64::new(0)),
            published: CachePadded::new(AtomicU64::new(0)),
            consumed: CachePadded::new(AtomicU64::new(0)),
            stopping: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Published-but-unconsumed event count.
    pub fn len(&self) -> usize {
        let consumed = self.consumed.load(Ordering::Acquire);
        let published = self.published.load(Ordering::Acquire);
        (published - consumed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once every claimed sequence has been consumed.
    pub fn is_idle(&self) -> bool {
        let claim = self.claim.load(Ordering::Acquire);
        self.consumed.load(Ordering::Acquire) == claim
    }

    /// Reject new claims from now on; callers fall back to synchronous
    /// delivery. Already claimed sequences are still published and drained.
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Try to claim the next sequence number for an event at `level`.
    ///
    /// Saturation is handled per `policy`; `on_saturation` is invoked once
    /// per claim attempt that first observes a full ring, for metrics.
    pub fn try_claim(
        &self,
        level: Level,
        policy: OverflowPolicy,
        on_saturation: impl FnOnce(),
    ) -> Claim {
        if self.stop_requested() {
            return Claim::Synchronous;
        }
        let capacity = self.slots.len() as u64;
        let backoff = Backoff::new();
        let mut saturation_seen = false;
        let mut on_saturation = Some(on_saturation);
        loop {
            let seq = self.claim.load(Ordering::Relaxed);
            if seq - self.consumed.load(Ordering::Acquire) >= capacity {
                if !saturation_seen {
                    saturation_seen = true;
                    if let Some(hook) = on_saturation.take() {
                        hook();
                    }
                }
                match policy {
                    OverflowPolicy::Block => {
                        if self.stop_requested() {
                            return Claim::Synchronous;
                        }
                        backoff.snooze();
                        continue;
                    }
                    OverflowPolicy::DiscardBelow(min) => {
                        if level < min {
                            return Claim::Discard;
                        }
                        // important events wait for a slot instead
                        if self.stop_requested() {
                            return Claim::Synchronous;
                        }
                        backoff.snooze();
                        continue;
                    }
                    OverflowPolicy::SynchronousFallback => return Claim::Synchronous,
                }
            }
            match self
                .claim
                .compare_exchange_weak(seq, seq + 1, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Claim::Granted(seq),
                Err(_) => backoff.spin(),
            }
        }
    }

    /// Fill the claimed slot and make it visible to the consumer.
    ///
    /// Blocks (bounded backoff) until every lower sequence has been
    /// published, so publication becomes visible strictly in sequence order.
    pub fn publish(&self, seq: u64, fill: impl FnOnce(&mut LogEvent)) {
        let slot = &self.slots[(seq & self.mask) as usize];
        // SAFETY: `seq` was claimed exclusively by this caller and has not
        // been published; no other thread accesses this slot (see the Sync
        // impl above).
        unsafe {
            fill(&mut *slot.0.get());
        }
        let backoff = Backoff::new();
        while self.published.load(Ordering::Acquire) != seq {
            backoff.snooze();
        }
        self.published.store(seq + 1, Ordering::Release);
    }

    /// Drain every newly published event in sequence order, invoking `f` for
    /// each. The last event of the pass is flagged `end_of_batch`. Returns
    /// the number of events drained.
    ///
    /// Exactly one consumer thread may drain a given ring; a concurrent call
    /// returns 0 without touching any slot.
    pub fn drain(&self, mut f: impl FnMut(&LogEvent)) -> usize {
        if self
            .draining
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return 0;
        }
        let next = self.consumed.load(Ordering::Relaxed);
        let available = self.published.load(Ordering::Acquire);
        for seq in next..available {
            let slot = &self.slots[(seq & self.mask) as usize];
            // SAFETY: `seq` is published and not yet consumed, so this
            // consumer has exclusive access until `consumed` advances.
            let event = unsafe { &mut *slot.0.get() };
            event.end_of_batch = seq + 1 == available;
            f(event);
        }
        self.consumed.store(available, Ordering::Release);
        self.draining.store(false, Ordering::Release);
        (available - next) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn publish_message(ring: &RingBuffer, seq: u64, text: &str) {
        ring.publish(seq, |event| {
            event.clear();
            event.message.push_str(text);
            event.level = Level::Info;
        });
    }

    fn claim_or_panic(ring: &RingBuffer, policy: OverflowPolicy) -> u64 {
        match ring.try_claim(Level::Info, policy, || {}) {
            Claim::Granted(seq) => seq,
            other => panic!("expected granted claim, got {:?}", other),
        }
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        assert_eq!(RingBuffer::with_capacity(5).capacity(), 8);
        assert_eq!(RingBuffer::with_capacity(8).capacity(), 8);
        assert_eq!(RingBuffer::with_capacity(0).capacity(), 2);
    }

    #[test]
    fn test_single_thread_order_and_end_of_batch() {
        let ring = RingBuffer::with_capacity(8);
        for i in 0..3 {
            let seq = claim_or_panic(&ring, OverflowPolicy::Block);
            publish_message(&ring, seq, &format!("m{}", i));
        }

        let mut seen = Vec::new();
        let drained = ring.drain(|event| seen.push((event.message.clone(), event.end_of_batch)));
        assert_eq!(drained, 3);
        assert_eq!(
            seen,
            vec![
                ("m0".to_string(), false),
                ("m1".to_string(), false),
                ("m2".to_string(), true),
            ]
        );
        assert!(ring.is_empty());
        assert!(ring.is_idle());
    }

    #[test]
    fn test_wraparound_reuses_slots() {
        let ring = RingBuffer::with_capacity(4);
        for round in 0..5 {
            for i in 0..4 {
                let seq = claim_or_panic(&ring, OverflowPolicy::Block);
                publish_message(&ring, seq, &format!("r{}-{}", round, i));
            }
            let mut seen = Vec::new();
            assert_eq!(ring.drain(|e| seen.push(e.message.clone())), 4);
            assert_eq!(seen[0], format!("r{}-0", round));
            assert_eq!(seen[3], format!("r{}-3", round));
        }
    }

    #[test]
    fn test_discard_below_when_saturated() {
        let ring = RingBuffer::with_capacity(2);
        for _ in 0..2 {
            let seq = claim_or_panic(&ring, OverflowPolicy::Block);
            publish_message(&ring, seq, "fill");
        }
        let policy = OverflowPolicy::DiscardBelow(Level::Warn);
        let mut saturated = false;
        let claim = ring.try_claim(Level::Debug, policy, || saturated = true);
        assert_eq!(claim, Claim::Discard);
        assert!(saturated);
    }

    #[test]
    fn test_synchronous_fallback_when_saturated() {
        let ring = RingBuffer::with_capacity(2);
        for _ in 0..2 {
            let seq = claim_or_panic(&ring, OverflowPolicy::Block);
            publish_message(&ring, seq, "fill");
        }
        let claim = ring.try_claim(Level::Info, OverflowPolicy::SynchronousFallback, || {});
        assert_eq!(claim, Claim::Synchronous);
    }

    #[test]
    fn test_stop_rejects_new_claims() {
        let ring = RingBuffer::with_capacity(4);
        ring.request_stop();
        let claim = ring.try_claim(Level::Info, OverflowPolicy::Block, || {});
        assert_eq!(claim, Claim::Synchronous);
    }

    #[test]
    fn test_multi_producer_claim_order_is_total_and_per_thread_fifo() {
        const PER_THREAD: usize = 500;
        let ring = Arc::new(RingBuffer::with_capacity(16));

        let mut producers = Vec::new();
        for tag in ["a", "b"] {
            let ring = Arc::clone(&ring);
            producers.push(std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let seq = match ring.try_claim(Level::Info, OverflowPolicy::Block, || {}) {
                        Claim::Granted(seq) => seq,
                        other => panic!("unexpected claim outcome {:?}", other),
                    };
                    ring.publish(seq, |event| {
                        event.clear();
                        event.message.push_str(&format!("{}{}", tag, i));
                    });
                }
            }));
        }

        let mut seen: Vec<String> = Vec::new();
        while seen.len() < 2 * PER_THREAD {
            ring.drain(|event| seen.push(event.message.clone()));
        }
        for handle in producers {
            handle.join().unwrap();
        }

        // per-producer order must match call order
        for tag in ["a", "b"] {
            let sub: Vec<usize> = seen
                .iter()
                .filter(|m| m.starts_with(tag))
                .map(|m| m[1..].parse().unwrap())
                .collect();
            assert_eq!(sub.len(), PER_THREAD);
            assert!(sub.windows(2).all(|w| w[0] < w[1]), "{} out of order", tag);
        }
    }
}
