//! State shared between the reactor, watcher and worker threads

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use emucard_core::{DeviceEvent, GuestApdu, ReaderHandle};
use tracing::trace;

use crate::queue::EventQueue;
use crate::wakeup::Wakeup;

/// State guarded by the request lock.
///
/// The guest APDU FIFO, the tracked reader and the worker's quit flag
/// share a single mutex by design, and the worker's condvar waits on
/// that same mutex so the flag is re-checked under it after every wake
/// (no lost-wakeup window).
#[derive(Default)]
pub(crate) struct ApduLane {
    pub(crate) requests: VecDeque<GuestApdu>,
    pub(crate) reader: Option<ReaderHandle>,
    pub(crate) quit: bool,
}

/// Everything the background threads share with the device facade.
///
/// Lock order: `lane` (requests + reader + quit) and the event queue are
/// independent; envelopes are only ever pushed with the lane lock
/// released.
pub(crate) struct Shared {
    pub(crate) lane: Mutex<ApduLane>,
    pub(crate) lane_cond: Condvar,
    pub(crate) events: EventQueue,
    pub(crate) wakeup: Wakeup,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            lane: Mutex::new(ApduLane::default()),
            lane_cond: Condvar::new(),
            events: EventQueue::new(),
            wakeup: Wakeup::new(),
        }
    }

    /// Queue an envelope and wake the reactor.
    ///
    /// Callers must not hold the lane lock.
    pub(crate) fn push_event(&self, event: DeviceEvent) {
        trace!(kind = event.kind(), "queueing device event");
        self.events.push(event);
        self.wakeup.signal();
    }
}
