//! Cross-thread wakeup channel for the reactor

use crossbeam_channel::{Receiver, Sender, bounded};

/// Coalescing wakeup-token channel.
///
/// Background threads call [`signal`] after queueing an event; the
/// reactor waits on the [`receiver`] alongside its other readiness
/// sources and calls [`drain`] before reprocessing. The channel buffers
/// at most one token: signalling while a token is already pending is a
/// no-op, which is safe because the payload travels through the event
/// queue, not the channel.
///
/// [`signal`]: Wakeup::signal
/// [`receiver`]: Wakeup::receiver
/// [`drain`]: Wakeup::drain
#[derive(Debug, Clone)]
pub struct Wakeup {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Wakeup {
    /// Create a wakeup channel with a single-token buffer.
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Wake the reactor. Never blocks the caller.
    ///
    /// A full buffer means a wakeup is already pending; either way the
    /// reactor is left with a token to observe.
    pub fn signal(&self) {
        let _ = self.tx.try_send(());
    }

    /// Consume all pending tokens without blocking.
    pub fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Receiver half for the reactor's readiness wait.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl Default for Wakeup {
    fn default() -> Self {
        Self::new()
    }
}
