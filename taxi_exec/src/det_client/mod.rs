//! # Detection Client
//!
//! Receives detection records published by the remote object detector. Records arrive as single
//! UDP datagrams on a non-blocking socket, and only the most recently decoded record is retained.
//! There is no history and no reordering: whichever record was decoded last is the current one,
//! even if its frame was captured before the previous record's.
//!
//! Two receive modes are provided:
//!
//! - [`DetReceiver`] is drained from inside the control loop once per cycle.
//! - [`BgDetClient`] drains on its own thread and hands records over through a [`DetSlot`].
//!
//! Records should be passed through [`freshness::usable`] before use, so that a stalled producer
//! degrades to "no detections" rather than obsolete detections.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod bg;
pub mod freshness;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::ErrorKind,
    net::{SocketAddr, UdpSocket},
    sync::{Arc, Mutex},
};

use log::{debug, warn};
use serde::Serialize;

use comms_if::{
    eqpt::det::DetectionRecord,
    net::{self, NetError, NetParams, MAX_DATAGRAM_SIZE},
};

pub use bg::BgDetClient;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Single-slot holder for the current detection record.
///
/// Storing a record replaces the previous one outright, nothing is queued. Clones share the same
/// slot, so one side can store while the other loads.
#[derive(Debug, Clone, Default)]
pub struct DetSlot {
    inner: Arc<Mutex<Option<Arc<DetectionRecord>>>>,
}

/// Receives detection datagrams on a non-blocking UDP socket.
pub struct DetReceiver {
    socket: UdpSocket,
    slot: DetSlot,

    /// Total number of records decoded since the receiver was created.
    packet_count: u64,

    /// Maximum number of datagrams handled by one call to `drain`.
    max_drain: usize,

    recv_buf: Vec<u8>,
}

/// Summary of a single drain of the socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// At least one valid record was decoded.
    pub received_any: bool,

    /// Number of valid records decoded.
    pub num_decoded: usize,

    /// Number of datagrams which could not be decoded.
    pub num_malformed: usize,

    /// The drain stopped because it reached the datagram cap, more may be queued.
    pub hit_cap: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DetClientError {
    #[error("Network error: {0}")]
    NetError(#[from] NetError),

    #[error("Could not read the socket's local address: {0}")]
    LocalAddrError(std::io::Error),

    #[error("Could not start the background receive thread: {0}")]
    ThreadError(std::io::Error),
}

/// A detection client in either receive mode.
pub enum DetClient {
    /// Drained by the control loop each cycle.
    InLoop(DetReceiver),

    /// Drained on a background thread.
    Background(BgDetClient),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current record.
    pub fn store(&self, record: DetectionRecord) {
        // A poisoned slot still holds a complete record, so keep using it.
        let mut slot = match self.inner.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(Arc::new(record));
    }

    /// Get the current record, or `None` if nothing has been stored yet.
    pub fn load(&self) -> Option<Arc<DetectionRecord>> {
        let slot = match self.inner.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone()
    }
}

impl DetReceiver {
    /// Bind a new receiver to the endpoint given in the network parameters.
    pub fn new(params: &NetParams) -> Result<Self, DetClientError> {
        Self::with_slot(params, DetSlot::new())
    }

    /// Bind a new receiver which stores records into an existing slot.
    pub fn with_slot(params: &NetParams, slot: DetSlot) -> Result<Self, DetClientError> {
        let socket = net::bind_nonblocking(&params.det_endpoint)?;

        Ok(Self {
            socket,
            slot,
            packet_count: 0,
            max_drain: params.det_max_drain.max(1),
            recv_buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    /// The address the receiver is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, DetClientError> {
        self.socket
            .local_addr()
            .map_err(DetClientError::LocalAddrError)
    }

    /// Handle every datagram currently queued on the socket, up to the drain cap.
    ///
    /// Never blocks. Malformed datagrams are logged and skipped, and a socket error ends the drain
    /// early while leaving the current record untouched.
    pub fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();

        for _ in 0..self.max_drain {
            let (len, src) = match self.socket.recv_from(&mut self.recv_buf) {
                Ok(r) => r,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return report,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Detection socket error, ending drain: {}", e);
                    return report;
                }
            };

            match DetectionRecord::from_bytes(&self.recv_buf[..len]) {
                Ok(record) => {
                    self.slot.store(record);
                    self.packet_count += 1;
                    report.received_any = true;
                    report.num_decoded += 1;
                }
                Err(e) => {
                    warn!("Discarding malformed detection datagram from {}: {}", src, e);
                    report.num_malformed += 1;
                }
            }
        }

        report.hit_cap = true;
        debug!(
            "Detection drain stopped at the cap of {} datagrams",
            self.max_drain
        );

        report
    }

    /// The current record, or `None` if no record has ever been decoded.
    pub fn latest(&self) -> Option<Arc<DetectionRecord>> {
        self.slot.load()
    }

    /// Total number of records decoded so far.
    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    /// A handle to the slot this receiver stores into.
    pub fn slot(&self) -> DetSlot {
        self.slot.clone()
    }
}

impl DetClient {
    /// Create a client in the requested mode.
    pub fn new(params: &NetParams, background: bool) -> Result<Self, DetClientError> {
        if background {
            Ok(DetClient::Background(BgDetClient::start(params)?))
        } else {
            Ok(DetClient::InLoop(DetReceiver::new(params)?))
        }
    }

    /// Bring the current record up to date.
    ///
    /// In loop mode this drains the socket and returns the report. In background mode the thread
    /// does the draining, and the report covers everything it drained since the last poll.
    pub fn poll(&mut self) -> DrainReport {
        match self {
            DetClient::InLoop(r) => r.drain(),
            DetClient::Background(c) => c.take_report(),
        }
    }

    pub fn latest(&self) -> Option<Arc<DetectionRecord>> {
        match self {
            DetClient::InLoop(r) => r.latest(),
            DetClient::Background(c) => c.latest(),
        }
    }

    pub fn packet_count(&self) -> u64 {
        match self {
            DetClient::InLoop(r) => r.packet_count(),
            DetClient::Background(c) => c.packet_count(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::{thread, time::Duration};

    fn test_params() -> NetParams {
        NetParams {
            det_endpoint: String::from("127.0.0.1:0"),
            ..Default::default()
        }
    }

    fn record_json(timestamp: f64, frame_id: u64) -> String {
        format!(
            r#"{{"timestamp": {}, "frame_id": {}, "objects": [
                {{"label": "person", "score": 0.8, "bbox": [280, 100, 360, 400]}}
            ]}}"#,
            timestamp, frame_id
        )
    }

    /// Send datagrams to the receiver and wait until they are all queued.
    fn send_all(rx: &DetReceiver, payloads: &[String]) {
        let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = rx.local_addr().unwrap();
        for p in payloads {
            tx.send_to(p.as_bytes(), addr).unwrap();
        }

        // Loopback delivery is effectively immediate but not synchronous with `send_to`
        thread::sleep(Duration::from_millis(50));
    }

    #[test]
    fn test_drain_empty() {
        let mut rx = DetReceiver::new(&test_params()).unwrap();

        let report = rx.drain();

        assert!(!report.received_any);
        assert_eq!(report.num_decoded, 0);
        assert!(rx.latest().is_none());
        assert_eq!(rx.packet_count(), 0);
    }

    #[test]
    fn test_drain_empty_keeps_latest() {
        let mut rx = DetReceiver::new(&test_params()).unwrap();
        send_all(&rx, &[record_json(100.0, 1)]);

        assert!(rx.drain().received_any);
        let before = rx.latest().unwrap();

        let report = rx.drain();
        assert!(!report.received_any);
        assert_eq!(*rx.latest().unwrap(), *before);
    }

    #[test]
    fn test_malformed_then_valid() {
        let mut rx = DetReceiver::new(&test_params()).unwrap();
        send_all(
            &rx,
            &[
                String::from(r#"{"objects": ["#),
                String::from(r#"{"objects": []}"#),
                record_json(42.0, 7),
            ],
        );

        let report = rx.drain();

        assert!(report.received_any);
        assert_eq!(report.num_decoded, 1);
        assert_eq!(report.num_malformed, 2);
        assert!(!report.hit_cap);

        let latest = rx.latest().unwrap();
        assert_eq!(latest.timestamp, 42.0);
        assert_eq!(latest.objects.len(), 1);
        assert_eq!(rx.packet_count(), 1);
    }

    #[test]
    fn test_last_decoded_wins() {
        let mut rx = DetReceiver::new(&test_params()).unwrap();

        // The second record is older by both frame and timestamp but arrives last
        send_all(&rx, &[record_json(200.0, 20), record_json(100.0, 10)]);
        rx.drain();

        let latest = rx.latest().unwrap();
        assert_eq!(latest.timestamp, 100.0);
        assert_eq!(latest.frame_id_str(), "10");
    }

    #[test]
    fn test_drain_cap() {
        let mut rx = DetReceiver::new(&test_params()).unwrap();
        let payloads: Vec<String> = (0..60).map(|i| record_json(i as f64, i)).collect();
        send_all(&rx, &payloads);

        let first = rx.drain();
        assert!(first.hit_cap);
        assert_eq!(first.num_decoded, 50);

        let second = rx.drain();
        assert!(!second.hit_cap);
        assert_eq!(second.num_decoded, 10);

        assert_eq!(rx.packet_count(), 60);
        assert_eq!(rx.latest().unwrap().timestamp, 59.0);
    }

    #[test]
    fn test_slot_replace() {
        let slot = DetSlot::new();
        assert!(slot.load().is_none());

        let other = slot.clone();
        other.store(DetectionRecord::from_json_str(&record_json(1.0, 1)).unwrap());
        other.store(DetectionRecord::from_json_str(&record_json(2.0, 2)).unwrap());

        assert_eq!(slot.load().unwrap().timestamp, 2.0);
    }
}
