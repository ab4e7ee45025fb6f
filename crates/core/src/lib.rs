//! Core types and trait seams for an emulated CCID card device
//!
//! This crate defines the vocabulary shared by the device implementation
//! and its collaborators:
//!
//! - [`DeviceEvent`] — the envelope queued from background threads to the
//!   reactor that owns the device state
//! - [`SourceEvent`] — the external reader-event stream
//! - [`Atr`] — a bounded Answer-To-Reset buffer
//! - [`CardTransceiver`] / [`ReaderEventSource`] — the seams behind which
//!   the real reader subsystem lives
//! - [`CardBus`] — the outbound notification surface toward the hosting bus
//!
//! APDU payloads are opaque byte buffers throughout; nothing here models
//! the smart-card protocol itself.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod atr;
pub mod bus;
pub mod event;
pub mod source;
pub mod transceiver;

pub use atr::{Atr, AtrError, MAX_ATR_SIZE};
pub use bus::CardBus;
pub use event::{DeviceEvent, GuestApdu, SourceEvent};
pub use source::ReaderEventSource;
pub use transceiver::{CardTransceiver, NO_READER_STATUS, ReaderHandle, XfrError};
