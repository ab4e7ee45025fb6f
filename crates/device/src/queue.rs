//! Thread-safe event queue drained by the reactor

use std::collections::VecDeque;
use std::sync::Mutex;

use emucard_core::DeviceEvent;

/// FIFO of [`DeviceEvent`]s shared between producer threads and the
/// reactor.
///
/// Producers append under the lock and never wait for the consumer. The
/// reactor detaches the entire backlog in a single critical section and
/// iterates it lock-free, so dispatching never starves the producers.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<DeviceEvent>>,
}

impl EventQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Append an event at the tail.
    pub fn push(&self, event: DeviceEvent) {
        self.events.lock().unwrap().push_back(event);
    }

    /// Detach and return the entire backlog, leaving the queue empty.
    ///
    /// Draining an empty queue is a no-op and returns an empty sequence.
    pub fn drain_all(&self) -> VecDeque<DeviceEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}
