//! Reader-event watcher thread
//!
//! A dedicated thread blocks on the external reader-event source,
//! translates each event into at most one [`DeviceEvent`] and pushes it
//! through the shared queue plus wakeup channel. Events for a reader
//! other than the tracked one are dropped and the loop keeps running, so
//! a reader swap can never leave stale notifications behind.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use emucard_core::{DeviceEvent, ReaderEventSource, ReaderHandle, SourceEvent};
use tracing::{debug, warn};

use crate::lane::Shared;

/// Spawn the thread that bridges the reader-event source into the
/// device's event queue.
pub(crate) fn spawn(
    source: Arc<dyn ReaderEventSource>,
    shared: Arc<Shared>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("emucard-watcher".into())
        .spawn(move || run(source.as_ref(), &shared))
}

fn run(source: &dyn ReaderEventSource, shared: &Shared) {
    debug!("reader event watcher started");
    loop {
        match source.wait_next() {
            SourceEvent::ReaderInsert(handle) => {
                // At most one reader is tracked; later inserts are ignored
                // until the tracked one goes away.
                let inserted = {
                    let mut lane = shared.lane.lock().unwrap();
                    if lane.reader.is_none() {
                        lane.reader = Some(handle);
                        true
                    } else {
                        false
                    }
                };
                if inserted {
                    debug!("reader inserted");
                    shared.push_event(DeviceEvent::ReaderInsert);
                } else {
                    debug!("reader insert ignored, a reader is already tracked");
                }
            }
            SourceEvent::ReaderRemove(handle) => {
                let removed = {
                    let mut lane = shared.lane.lock().unwrap();
                    match &lane.reader {
                        Some(current) if Arc::ptr_eq(current, &handle) => {
                            lane.reader = None;
                            true
                        }
                        _ => false,
                    }
                };
                if removed {
                    debug!("reader removed");
                    shared.push_event(DeviceEvent::ReaderRemove);
                } else {
                    debug!("reader remove ignored, not the tracked reader");
                }
            }
            SourceEvent::CardInsert(handle) => {
                if !is_tracked(shared, &handle) {
                    debug!("card insert ignored, not the tracked reader");
                    continue;
                }
                // The ATR only travels inside the envelope; the cached copy
                // on the device is written by the reactor thread alone.
                match handle.power_on() {
                    Ok(atr) => {
                        debug!(atr = %hex::encode_upper(atr.as_bytes()), "card inserted");
                        shared.push_event(DeviceEvent::CardInsert(atr));
                    }
                    Err(err) => {
                        warn!(status = err.status(), "card power-on failed");
                        shared.push_event(DeviceEvent::Error(err.status()));
                    }
                }
            }
            SourceEvent::CardRemove(handle) => {
                if !is_tracked(shared, &handle) {
                    debug!("card remove ignored, not the tracked reader");
                    continue;
                }
                debug!("card removed");
                shared.push_event(DeviceEvent::CardRemove);
            }
            SourceEvent::Shutdown => break,
        }
    }
    debug!("reader event watcher exiting");
}

fn is_tracked(shared: &Shared, handle: &ReaderHandle) -> bool {
    let lane = shared.lane.lock().unwrap();
    lane.reader.as_ref().is_some_and(|r| Arc::ptr_eq(r, handle))
}
