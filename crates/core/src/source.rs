//! External reader-event source seam

use crate::event::SourceEvent;

/// Blocking stream of reader and card events, driven by an external
/// subsystem on its own schedule.
///
/// The watcher thread is the only caller of [`wait_next`]; the shutdown
/// protocol uses [`post_shutdown`] to make that call return
/// [`SourceEvent::Shutdown`] so the watcher can exit.
///
/// [`wait_next`]: ReaderEventSource::wait_next
/// [`post_shutdown`]: ReaderEventSource::post_shutdown
pub trait ReaderEventSource: Send + Sync {
    /// Block until the next event is available.
    fn wait_next(&self) -> SourceEvent;

    /// Deliver [`SourceEvent::Shutdown`] to the waiter.
    ///
    /// Must not block; called from the device's shutdown path. Events
    /// already queued ahead of the terminal one are still delivered
    /// first.
    fn post_shutdown(&self);
}
