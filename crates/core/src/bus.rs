//! Outbound notifications toward the hosting bus

use bytes::Bytes;

/// Notifications the device delivers to its hosting bus and guest.
///
/// All methods are invoked on the reactor thread, in envelope order, and
/// must not block. Runtime exchange failures arrive through
/// [`card_error`] rather than as return values anywhere else.
///
/// [`card_error`]: CardBus::card_error
pub trait CardBus: Send + Sync {
    /// A reader is now attached to the device.
    fn reader_attached(&self);

    /// The attached reader went away.
    fn reader_detached(&self);

    /// A card was inserted; the device's ATR cache is already updated.
    fn card_inserted(&self);

    /// The card was removed.
    fn card_removed(&self);

    /// An exchange failed with the given opaque status code.
    fn card_error(&self, code: u64);

    /// Deliver a response APDU for an earlier submission.
    fn deliver_response(&self, apdu: Bytes);
}
