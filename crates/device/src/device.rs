//! Device facade: guest API, reactor-side dispatcher and shutdown

use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::Bytes;
use crossbeam_channel::Receiver;
use emucard_core::{Atr, CardBus, DeviceEvent, GuestApdu, ReaderEventSource};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ConfigError, DeviceConfig};
use crate::lane::Shared;
use crate::{watcher, worker};

/// Errors that prevent the device from starting.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A background thread could not be spawned.
    #[error("failed to spawn the {name} thread")]
    Spawn {
        /// Thread that failed to start.
        name: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// The emulated CCID card device.
///
/// Owns the two background threads (reader-event watcher and APDU
/// exchange worker) and the reactor-side state. All state mutation
/// happens on the thread that calls [`process_pending`]; the inbound
/// guest calls ([`submit_apdu`], [`atr`]) and the background threads
/// communicate through the shared queues only.
///
/// The owning reactor registers [`wakeup_receiver`] in its readiness
/// wait and calls [`process_pending`] whenever a token arrives.
///
/// [`process_pending`]: EmulatedCardDevice::process_pending
/// [`submit_apdu`]: EmulatedCardDevice::submit_apdu
/// [`atr`]: EmulatedCardDevice::atr
/// [`wakeup_receiver`]: EmulatedCardDevice::wakeup_receiver
pub struct EmulatedCardDevice {
    shared: Arc<Shared>,
    source: Arc<dyn ReaderEventSource>,
    bus: Arc<dyn CardBus>,
    config: DeviceConfig,
    atr: Atr,
    watcher: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for EmulatedCardDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedCardDevice")
            .field("config", &self.config)
            .field("atr", &self.atr)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl EmulatedCardDevice {
    /// Validate `config` and start the device.
    ///
    /// Both background threads are running when this returns. Nothing is
    /// spawned if validation fails, and a spawn failure tears down the
    /// thread that already started before returning.
    pub fn new(
        config: DeviceConfig,
        source: Arc<dyn ReaderEventSource>,
        bus: Arc<dyn CardBus>,
    ) -> Result<Self, DeviceError> {
        config.validate()?;

        let shared = Arc::new(Shared::new());
        let worker =
            worker::spawn(Arc::clone(&shared)).map_err(|source| DeviceError::Spawn {
                name: "apdu worker",
                source,
            })?;
        let watcher = match watcher::spawn(Arc::clone(&source), Arc::clone(&shared)) {
            Ok(handle) => handle,
            Err(err) => {
                {
                    let mut lane = shared.lane.lock().unwrap();
                    lane.quit = true;
                }
                shared.lane_cond.notify_all();
                let _ = worker.join();
                return Err(DeviceError::Spawn {
                    name: "reader event watcher",
                    source: err,
                });
            }
        };

        debug!(backend = ?config.backend, "emulated card device started");
        Ok(Self {
            shared,
            source,
            bus,
            config,
            atr: Atr::empty(),
            watcher: Some(watcher),
            worker: Some(worker),
        })
    }

    /// Queue a guest APDU for the exchange worker.
    ///
    /// Never blocks; the response (or error) arrives later as a bus
    /// notification, in submission order.
    pub fn submit_apdu(&self, apdu: &[u8]) {
        trace!(apdu = %hex::encode_upper(apdu), "guest apdu submitted");
        {
            let mut lane = self.shared.lane.lock().unwrap();
            lane.requests
                .push_back(GuestApdu(Bytes::copy_from_slice(apdu)));
        }
        self.shared.lane_cond.notify_one();
    }

    /// Cached ATR of the inserted card; empty while no card has been
    /// seen. Always succeeds.
    pub fn atr(&self) -> &[u8] {
        self.atr.as_bytes()
    }

    /// Receiver the reactor waits on; a pending token means
    /// [`process_pending`](Self::process_pending) has work to do.
    pub fn wakeup_receiver(&self) -> &Receiver<()> {
        self.shared.wakeup.receiver()
    }

    /// Drain and apply all queued envelopes, invoking the bus
    /// notifications in queue order.
    ///
    /// Must be called from the thread that owns the device; this is the
    /// only place device state is mutated.
    pub fn process_pending(&mut self) {
        self.shared.wakeup.drain();
        for event in self.shared.events.drain_all() {
            trace!(kind = event.kind(), "dispatching device event");
            match event {
                DeviceEvent::ResponseApdu(apdu) => self.bus.deliver_response(apdu),
                DeviceEvent::ReaderInsert => self.bus.reader_attached(),
                DeviceEvent::ReaderRemove => self.bus.reader_detached(),
                DeviceEvent::CardInsert(atr) => {
                    // The envelope's Atr is already bounded; this copy is
                    // the single writer of the cache.
                    self.atr = atr;
                    self.bus.card_inserted();
                }
                DeviceEvent::CardRemove => self.bus.card_removed(),
                DeviceEvent::Error(code) => self.bus.card_error(code),
            }
        }
    }

    /// The configuration the device was constructed with.
    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Stop both background threads and wait for them to exit.
    ///
    /// Ordered protocol: the terminal source event stops the watcher, the
    /// quit flag plus a condvar broadcast stops the worker, and joining
    /// both handles is the confirmation that no thread still touches the
    /// shared state. Envelopes and requests still queued at this point
    /// are discarded. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.watcher.is_none() && self.worker.is_none() {
            return;
        }
        debug!("shutting down emulated card device");
        self.source.post_shutdown();
        {
            let mut lane = self.shared.lane.lock().unwrap();
            lane.quit = true;
        }
        self.shared.lane_cond.notify_all();
        if let Some(handle) = self.watcher.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        debug!("emulated card device stopped");
    }
}

impl Drop for EmulatedCardDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}
