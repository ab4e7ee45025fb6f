//! Card transceiver seam
//!
//! The reader subsystem behind this trait is implemented elsewhere; the
//! device core only needs a blocking power-on and a blocking exchange.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::atr::Atr;

/// Status reported to the guest when an APDU is submitted while no reader
/// is attached.
pub const NO_READER_STATUS: u64 = u64::MAX;

/// Failure status from a reader call, carried verbatim to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("reader exchange failed (status {0:#x})")]
pub struct XfrError(pub u64);

impl XfrError {
    /// The opaque status code reported by the reader.
    pub const fn status(&self) -> u64 {
        self.0
    }
}

/// Synchronous card access offered by a reader.
///
/// Both calls may block for as long as the reader needs; they are only
/// ever invoked from threads that are allowed to wait, never from the
/// reactor.
pub trait CardTransceiver: Send + Sync {
    /// Power the card on and return its ATR.
    fn power_on(&self) -> Result<Atr, XfrError>;

    /// Exchange one APDU with the card and return the response bytes.
    fn transmit(&self, apdu: &[u8]) -> Result<Bytes, XfrError>;
}

/// Shared handle to a reader's transceiver.
///
/// Handle identity (`Arc::ptr_eq`) is what ties a [`SourceEvent`] to the
/// tracked reader; at most one handle is tracked at a time.
///
/// [`SourceEvent`]: crate::event::SourceEvent
pub type ReaderHandle = Arc<dyn CardTransceiver>;
