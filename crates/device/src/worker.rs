//! APDU exchange worker thread
//!
//! The worker sleeps on a condition variable until the reactor queues
//! guest APDUs, then forwards them to the tracked reader one by one.
//! Exactly one [`DeviceEvent::ResponseApdu`] or [`DeviceEvent::Error`]
//! is produced per request, in submission order.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use emucard_core::{DeviceEvent, NO_READER_STATUS};
use tracing::{debug, trace};

use crate::lane::Shared;

/// Spawn the thread that services the guest APDU queue.
pub(crate) fn spawn(shared: Arc<Shared>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("emucard-apdu".into())
        .spawn(move || run(&shared))
}

fn run(shared: &Shared) {
    debug!("apdu exchange worker started");
    loop {
        // Detach the whole backlog and a handle to the current reader in
        // one critical section; the exchange itself runs with no lock
        // held, so a hung reader call never blocks submission or removal.
        let (batch, reader) = {
            let lane = shared.lane.lock().unwrap();
            let mut lane = shared
                .lane_cond
                .wait_while(lane, |l| l.requests.is_empty() && !l.quit)
                .unwrap();
            if lane.quit {
                // Requests still queued at shutdown are discarded.
                break;
            }
            (std::mem::take(&mut lane.requests), lane.reader.clone())
        };

        for request in batch {
            let Some(reader) = reader.as_ref() else {
                debug!("no reader attached, rejecting guest apdu");
                shared.push_event(DeviceEvent::Error(NO_READER_STATUS));
                continue;
            };
            trace!(apdu = %hex::encode_upper(&request.0), "forwarding guest apdu");
            match reader.transmit(&request.0) {
                Ok(response) => {
                    trace!(
                        response = %hex::encode_upper(&response),
                        "received response apdu"
                    );
                    shared.push_event(DeviceEvent::ResponseApdu(response));
                }
                Err(err) => {
                    debug!(status = err.status(), "reader exchange failed");
                    shared.push_event(DeviceEvent::Error(err.status()));
                }
            }
        }
    }
    debug!("apdu exchange worker exiting");
}
