//! Threaded event bridge and APDU pipeline for an emulated CCID card
//!
//! This crate turns the asynchronous reader subsystem behind
//! [`ReaderEventSource`](emucard_core::ReaderEventSource) and
//! [`CardTransceiver`](emucard_core::CardTransceiver) into notifications
//! for a single-threaded reactor that owns the device state. Two
//! background threads do the blocking work:
//!
//! - the **watcher** waits on the reader-event source and tracks the
//!   (at most one) current reader
//! - the **worker** forwards guest APDUs to the reader synchronously
//!
//! Both funnel their results through a mutex-protected event queue plus a
//! coalescing wakeup channel; the reactor drains both with
//! [`EmulatedCardDevice::process_pending`].
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # use std::sync::Arc;
//! # use emucard_core::{CardBus, ReaderEventSource};
//! # fn event_source() -> Arc<dyn ReaderEventSource> { unimplemented!() }
//! # fn ccid_bus() -> Arc<dyn CardBus> { unimplemented!() }
//! use emucard_device::{DeviceConfig, EmulatedCardDevice};
//!
//! let config = DeviceConfig::new().with_debug(1);
//! let mut device = EmulatedCardDevice::new(config, event_source(), ccid_bus())?;
//!
//! // Reactor loop: wait for a wakeup token, then apply pending events.
//! loop {
//!     device.wakeup_receiver().recv()?;
//!     device.process_pending();
//! }
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Core modules
mod config;
mod device;
mod lane;
mod queue;
mod wakeup;
mod watcher;
mod worker;

// Public exports
pub use config::{
    BACKEND_CERTIFICATES, BACKEND_NSS_EMULATED, Backend, CERTIFICATES_DEFAULT_DB, ConfigError,
    DeviceConfig,
};
pub use device::{DeviceError, EmulatedCardDevice};
pub use queue::EventQueue;
pub use wakeup::Wakeup;

// Re-export the core vocabulary for convenience
pub use emucard_core::{
    Atr, AtrError, CardBus, CardTransceiver, DeviceEvent, GuestApdu, MAX_ATR_SIZE,
    NO_READER_STATUS, ReaderEventSource, ReaderHandle, SourceEvent, XfrError,
};
