//! Garbage-free event store with thread-local recycling
//!
//! Each producer thread owns one cached event slot. `acquire` reuses the
//! cached slot in place when it is unreserved, so repeated acquire/release
//! cycles on one thread amortize to zero allocation. A slot still marked
//! reserved (the previous event has not been released yet) is never
//! overwritten; `acquire` allocates a fresh slot instead and makes it the
//! thread's new cache.

use super::log_event::LogEvent;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

// Thread-local caches for thread identity, computed once per thread.
thread_local! {
    static CACHED_SLOT: RefCell<Option<Rc<EventSlot>>> = const { RefCell::new(None) };
}

/// A recyclable backing store for one [`LogEvent`].
///
/// The `reserved` bit guards against reentrant overwrite: while an acquired
/// event is logically in flight, a second acquire on the same thread gets a
/// different slot.
pub struct EventSlot {
    reserved: Cell<bool>,
    event: RefCell<LogEvent>,
}

impl EventSlot {
    fn for_current_thread() -> Self {
        let current = std::thread::current();
        let event = LogEvent {
            thread_id: format!("{:?}", current.id()),
            thread_name: current.name().map(String::from),
            ..LogEvent::default()
        };
        Self {
            reserved: Cell::new(false),
            event: RefCell::new(event),
        }
    }
}

/// Writable handle to an acquired event, bound to the calling thread.
///
/// Dropping the handle releases the slot: all payload fields are cleared and
/// the reserved bit is switched off, making the slot clean for reuse.
pub struct EventHandle {
    slot: Rc<EventSlot>,
}

impl EventHandle {
    /// Borrow the event mutably for filling.
    pub fn event_mut(&self) -> RefMut<'_, LogEvent> {
        self.slot.event.borrow_mut()
    }

    /// Borrow the event read-only, e.g. to copy it into the transport.
    pub fn event(&self) -> Ref<'_, LogEvent> {
        self.slot.event.borrow()
    }

    /// Clear the event and hand the slot back for reuse.
    ///
    /// Equivalent to dropping the handle; provided for explicitness.
    pub fn release(self) {}
}

impl Drop for EventHandle {
    fn drop(&mut self) {
        // Clear before unreserving so a clean slot is the only reusable state.
        self.slot.event.borrow_mut().clear();
        self.slot.reserved.set(false);
    }
}

/// Acquire a writable event for the calling thread. Never fails: worst case
/// it allocates a replacement slot.
pub fn acquire() -> EventHandle {
    let slot = CACHED_SLOT.with(|cached| {
        let mut cached = cached.borrow_mut();
        match cached.as_ref() {
            Some(slot) if !slot.reserved.get() => Rc::clone(slot),
            // None on first use; reserved when the previous event is still in
            // flight (programming misuse) - either way, a fresh slot becomes
            // the new cache and the in-flight one is left untouched.
            _ => {
                let fresh = Rc::new(EventSlot::for_current_thread());
                *cached = Some(Rc::clone(&fresh));
                fresh
            }
        }
    });
    slot.reserved.set(true);
    EventHandle { slot }
}
