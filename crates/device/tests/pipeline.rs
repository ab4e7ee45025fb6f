//! End-to-end pipeline tests with scripted collaborators
//!
//! A channel-backed event source and a scripted transceiver stand in for
//! the real reader subsystem; a recording bus captures every outbound
//! notification in order.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender, unbounded};
use emucard_device::{
    Atr, CardBus, CardTransceiver, DeviceConfig, EmulatedCardDevice, NO_READER_STATUS,
    ReaderEventSource, ReaderHandle, SourceEvent, XfrError,
};

/// Reader-event source fed by the test over a channel.
struct ScriptedEventSource {
    tx: Sender<SourceEvent>,
    rx: Receiver<SourceEvent>,
}

impl ScriptedEventSource {
    fn new() -> Arc<Self> {
        let (tx, rx) = unbounded();
        Arc::new(Self { tx, rx })
    }

    fn send(&self, event: SourceEvent) {
        self.tx.send(event).unwrap();
    }
}

impl ReaderEventSource for ScriptedEventSource {
    fn wait_next(&self) -> SourceEvent {
        self.rx.recv().unwrap_or(SourceEvent::Shutdown)
    }

    fn post_shutdown(&self) {
        let _ = self.tx.send(SourceEvent::Shutdown);
    }
}

/// Transceiver that answers with a fixed ATR and echoes each APDU with a
/// 90 00 trailer, or fails every exchange with a scripted status.
struct MockTransceiver {
    atr: Vec<u8>,
    fail_status: Option<u64>,
}

impl MockTransceiver {
    fn ok(atr: &[u8]) -> ReaderHandle {
        Arc::new(Self {
            atr: atr.to_vec(),
            fail_status: None,
        })
    }

    fn failing(status: u64) -> ReaderHandle {
        Arc::new(Self {
            atr: vec![0x3B, 0x00],
            fail_status: Some(status),
        })
    }
}

impl CardTransceiver for MockTransceiver {
    fn power_on(&self) -> Result<Atr, XfrError> {
        Ok(Atr::from_bytes(&self.atr).unwrap())
    }

    fn transmit(&self, apdu: &[u8]) -> Result<Bytes, XfrError> {
        if let Some(status) = self.fail_status {
            return Err(XfrError(status));
        }
        let mut response = apdu.to_vec();
        response.extend_from_slice(&[0x90, 0x00]);
        Ok(Bytes::from(response))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BusCall {
    ReaderAttached,
    ReaderDetached,
    CardInserted,
    CardRemoved,
    Error(u64),
    Response(Bytes),
}

/// Bus that records every notification in dispatch order.
#[derive(Default)]
struct RecordingBus {
    calls: Mutex<Vec<BusCall>>,
}

impl RecordingBus {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn calls(&self) -> Vec<BusCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CardBus for RecordingBus {
    fn reader_attached(&self) {
        self.calls.lock().unwrap().push(BusCall::ReaderAttached);
    }

    fn reader_detached(&self) {
        self.calls.lock().unwrap().push(BusCall::ReaderDetached);
    }

    fn card_inserted(&self) {
        self.calls.lock().unwrap().push(BusCall::CardInserted);
    }

    fn card_removed(&self) {
        self.calls.lock().unwrap().push(BusCall::CardRemoved);
    }

    fn card_error(&self, code: u64) {
        self.calls.lock().unwrap().push(BusCall::Error(code));
    }

    fn deliver_response(&self, apdu: Bytes) {
        self.calls.lock().unwrap().push(BusCall::Response(apdu));
    }
}

fn start_device() -> (EmulatedCardDevice, Arc<ScriptedEventSource>, Arc<RecordingBus>) {
    let source = ScriptedEventSource::new();
    let bus = RecordingBus::new();
    let device = EmulatedCardDevice::new(
        DeviceConfig::new(),
        Arc::clone(&source) as Arc<dyn ReaderEventSource>,
        Arc::clone(&bus) as Arc<dyn CardBus>,
    )
    .unwrap();
    (device, source, bus)
}

/// Drive the reactor side until `count` bus calls have been observed.
fn pump_until(device: &mut EmulatedCardDevice, bus: &RecordingBus, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while bus.calls().len() < count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        assert!(
            !remaining.is_zero(),
            "timed out waiting for {count} bus calls, got {:?}",
            bus.calls()
        );
        let _ = device.wakeup_receiver().recv_timeout(remaining);
        device.process_pending();
    }
}

/// Give the background threads a moment, then assert no further calls
/// arrived beyond `expected`.
fn assert_settled(device: &mut EmulatedCardDevice, bus: &RecordingBus, expected: usize) {
    std::thread::sleep(Duration::from_millis(100));
    device.process_pending();
    assert_eq!(bus.calls().len(), expected, "unexpected extra bus calls");
}

#[test]
fn responses_preserve_submission_order() {
    let (mut device, source, bus) = start_device();
    let reader = MockTransceiver::ok(&[0x3B, 0x00]);
    source.send(SourceEvent::ReaderInsert(Arc::clone(&reader)));
    pump_until(&mut device, &bus, 1);
    assert_eq!(bus.calls(), vec![BusCall::ReaderAttached]);

    device.submit_apdu(&[0x01]);
    device.submit_apdu(&[0x02]);
    device.submit_apdu(&[0x03]);
    pump_until(&mut device, &bus, 4);

    let calls = bus.calls();
    assert_eq!(
        &calls[1..],
        &[
            BusCall::Response(Bytes::from_static(&[0x01, 0x90, 0x00])),
            BusCall::Response(Bytes::from_static(&[0x02, 0x90, 0x00])),
            BusCall::Response(Bytes::from_static(&[0x03, 0x90, 0x00])),
        ]
    );
}

#[test]
fn no_reader_yields_one_error_per_submission() {
    let (mut device, _source, bus) = start_device();
    device.submit_apdu(&[0x00, 0xA4]);
    device.submit_apdu(&[0x00, 0xB0]);
    pump_until(&mut device, &bus, 2);

    assert_eq!(
        bus.calls(),
        vec![
            BusCall::Error(NO_READER_STATUS),
            BusCall::Error(NO_READER_STATUS),
        ]
    );
    assert_settled(&mut device, &bus, 2);
}

#[test]
fn atr_is_empty_before_card_insert_and_exact_after() {
    let (mut device, source, bus) = start_device();
    assert!(device.atr().is_empty());

    let reader = MockTransceiver::ok(&[0x3B, 0x00]);
    source.send(SourceEvent::ReaderInsert(Arc::clone(&reader)));
    source.send(SourceEvent::CardInsert(Arc::clone(&reader)));
    pump_until(&mut device, &bus, 2);

    assert_eq!(
        bus.calls(),
        vec![BusCall::ReaderAttached, BusCall::CardInserted]
    );
    assert_eq!(device.atr(), &[0x3B, 0x00]);

    // Removal notifies but leaves the cached ATR in place.
    source.send(SourceEvent::CardRemove(Arc::clone(&reader)));
    pump_until(&mut device, &bus, 3);
    assert_eq!(bus.calls()[2], BusCall::CardRemoved);
    assert_eq!(device.atr(), &[0x3B, 0x00]);
}

#[test]
fn duplicate_reader_insert_is_ignored() {
    let (mut device, source, bus) = start_device();
    let first = MockTransceiver::ok(&[0x3B, 0x95]);
    let second = MockTransceiver::ok(&[0x3B, 0x11]);

    source.send(SourceEvent::ReaderInsert(Arc::clone(&first)));
    source.send(SourceEvent::ReaderInsert(Arc::clone(&second)));
    // The first reader is still the tracked one: its card events land,
    // the second reader's are dropped.
    source.send(SourceEvent::CardInsert(Arc::clone(&first)));
    pump_until(&mut device, &bus, 2);

    assert_eq!(
        bus.calls(),
        vec![BusCall::ReaderAttached, BusCall::CardInserted]
    );
    assert_eq!(device.atr(), &[0x3B, 0x95]);
    assert_settled(&mut device, &bus, 2);
}

#[test]
fn foreign_reader_card_events_are_dropped() {
    let (mut device, source, bus) = start_device();
    let tracked = MockTransceiver::ok(&[0x3B, 0x95]);
    let foreign = MockTransceiver::ok(&[0x3B, 0x11]);

    source.send(SourceEvent::ReaderInsert(Arc::clone(&tracked)));
    source.send(SourceEvent::CardInsert(Arc::clone(&foreign)));
    source.send(SourceEvent::CardRemove(Arc::clone(&foreign)));
    source.send(SourceEvent::ReaderRemove(Arc::clone(&foreign)));
    // A later event for the tracked reader proves the watcher kept
    // running past the dropped ones.
    source.send(SourceEvent::CardInsert(Arc::clone(&tracked)));
    pump_until(&mut device, &bus, 2);

    assert_eq!(
        bus.calls(),
        vec![BusCall::ReaderAttached, BusCall::CardInserted]
    );
    assert_eq!(device.atr(), &[0x3B, 0x95]);
    assert_settled(&mut device, &bus, 2);
}

#[test]
fn transceiver_failure_surfaces_status_code() {
    let (mut device, source, bus) = start_device();
    let reader = MockTransceiver::failing(0x42);
    source.send(SourceEvent::ReaderInsert(Arc::clone(&reader)));
    pump_until(&mut device, &bus, 1);

    device.submit_apdu(&[0x00, 0xA4, 0x04, 0x00]);
    pump_until(&mut device, &bus, 2);
    assert_eq!(bus.calls()[1], BusCall::Error(0x42));
}

#[test]
fn reader_remove_then_submit_yields_no_reader_error() {
    let (mut device, source, bus) = start_device();
    let reader = MockTransceiver::ok(&[0x3B, 0x00]);
    source.send(SourceEvent::ReaderInsert(Arc::clone(&reader)));
    source.send(SourceEvent::ReaderRemove(Arc::clone(&reader)));
    pump_until(&mut device, &bus, 2);
    assert_eq!(
        bus.calls(),
        vec![BusCall::ReaderAttached, BusCall::ReaderDetached]
    );

    device.submit_apdu(&[0x01]);
    pump_until(&mut device, &bus, 3);
    assert_eq!(bus.calls()[2], BusCall::Error(NO_READER_STATUS));
}

#[test]
fn reader_and_response_streams_each_keep_fifo_order() {
    let (mut device, source, bus) = start_device();
    let reader = MockTransceiver::ok(&[0x3B, 0x00]);
    source.send(SourceEvent::ReaderInsert(Arc::clone(&reader)));
    pump_until(&mut device, &bus, 1);

    device.submit_apdu(&[0x01]);
    device.submit_apdu(&[0x02]);
    source.send(SourceEvent::CardRemove(Arc::clone(&reader)));
    pump_until(&mut device, &bus, 4);

    // The interleaving of the two streams is arrival order, but each
    // stream keeps its own FIFO order.
    let calls = bus.calls();
    let responses: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            BusCall::Response(apdu) => Some(apdu.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        responses,
        vec![
            Bytes::from_static(&[0x01, 0x90, 0x00]),
            Bytes::from_static(&[0x02, 0x90, 0x00]),
        ]
    );
    assert_eq!(
        calls.iter().filter(|c| **c == BusCall::CardRemoved).count(),
        1
    );
}

#[test]
fn shutdown_completes_and_is_idempotent() {
    let (mut device, source, bus) = start_device();
    let reader = MockTransceiver::ok(&[0x3B, 0x00]);
    source.send(SourceEvent::ReaderInsert(Arc::clone(&reader)));
    pump_until(&mut device, &bus, 1);
    device.submit_apdu(&[0x01]);

    // join() inside shutdown is the proof both threads terminated.
    device.shutdown();
    device.shutdown();
    drop(device);
}

#[test]
fn construction_fails_on_invalid_config() {
    let source = ScriptedEventSource::new();
    let bus = RecordingBus::new();
    let config = DeviceConfig::new()
        .with_backend("certificates".parse().unwrap());
    let err = EmulatedCardDevice::new(
        config,
        Arc::clone(&source) as Arc<dyn ReaderEventSource>,
        Arc::clone(&bus) as Arc<dyn CardBus>,
    )
    .unwrap_err();
    assert!(err.to_string().contains("cert1"));
}
