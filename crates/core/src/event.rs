//! Cross-thread event records

use std::fmt;

use bytes::Bytes;

use crate::atr::Atr;
use crate::transceiver::ReaderHandle;

/// A single notification queued from a producer thread to the reactor.
///
/// Envelopes are created by the watcher and worker threads, owned by the
/// event queue until drained, and consumed exactly once by the dispatcher
/// on the reactor thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A reader became the tracked reader.
    ReaderInsert,
    /// The tracked reader was removed.
    ReaderRemove,
    /// A card was inserted; carries the ATR staged by the watcher.
    CardInsert(Atr),
    /// The card was removed from the tracked reader.
    CardRemove,
    /// Response to a guest APDU, in submission order.
    ResponseApdu(Bytes),
    /// An exchange failed; carries the opaque reader status code.
    Error(u64),
}

impl DeviceEvent {
    /// Static name of the event kind, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ReaderInsert => "READER_INSERT",
            Self::ReaderRemove => "READER_REMOVE",
            Self::CardInsert(_) => "CARD_INSERT",
            Self::CardRemove => "CARD_REMOVE",
            Self::ResponseApdu(_) => "RESPONSE_APDU",
            Self::Error(_) => "ERROR",
        }
    }
}

/// An opaque guest APDU queued for the exchange worker.
///
/// Created by the reactor on submission and consumed exactly once by the
/// worker; each request yields exactly one [`DeviceEvent::ResponseApdu`]
/// or [`DeviceEvent::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestApdu(pub Bytes);

/// Events delivered by the external reader-event source.
///
/// Every variant except [`Shutdown`](Self::Shutdown) carries the handle of
/// the reader it concerns; the watcher compares it against the tracked
/// reader by handle identity.
#[derive(Clone)]
pub enum SourceEvent {
    /// A reader appeared.
    ReaderInsert(ReaderHandle),
    /// A reader disappeared.
    ReaderRemove(ReaderHandle),
    /// A card was inserted into a reader.
    CardInsert(ReaderHandle),
    /// A card was removed from a reader.
    CardRemove(ReaderHandle),
    /// Terminal event; the watcher exits its loop.
    Shutdown,
}

impl SourceEvent {
    /// Static name of the event kind, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ReaderInsert(_) => "READER_INSERT",
            Self::ReaderRemove(_) => "READER_REMOVE",
            Self::CardInsert(_) => "CARD_INSERT",
            Self::CardRemove(_) => "CARD_REMOVE",
            Self::Shutdown => "SHUTDOWN",
        }
    }
}

// Reader handles are trait objects without a Debug bound, so print the
// kind only.
impl fmt::Debug for SourceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
