//! Background detection client
//!
//! Runs a [`DetReceiver`] on its own thread so that datagrams are picked up as they arrive rather
//! than once per control cycle. The control loop only ever reads the shared [`DetSlot`], it never
//! waits on the socket.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};

use comms_if::{eqpt::det::DetectionRecord, net::NetParams};

use super::{DetClientError, DetReceiver, DetSlot, DrainReport};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct BgDetClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    slot: DetSlot,
    counters: Arc<Counters>,
    local_addr: SocketAddr,
}

/// Counters shared with the background thread.
///
/// The drain counts accumulate until the next call to [`BgDetClient::take_report`].
#[derive(Default)]
struct Counters {
    packet_count: AtomicU64,
    num_decoded: AtomicUsize,
    num_malformed: AtomicUsize,
    hit_cap: AtomicBool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BgDetClient {
    /// Bind the socket and start the background thread.
    pub fn start(params: &NetParams) -> Result<Self, DetClientError> {
        let slot = DetSlot::new();
        let receiver = DetReceiver::with_slot(params, slot.clone())?;
        let local_addr = receiver.local_addr()?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let bg_run_clone = bg_run.clone();
        let counters_clone = counters.clone();
        let period_s = match params.det_bg_poll_period_s {
            p if p.is_finite() && p >= 0.0 => p,
            p => {
                warn!("Invalid background poll period ({} s), using the default", p);
                NetParams::default().det_bg_poll_period_s
            }
        };
        let period = Duration::from_secs_f64(period_s);

        let bg_jh = thread::Builder::new()
            .name(String::from("det_client"))
            .spawn(move || bg_thread(receiver, bg_run_clone, counters_clone, period))
            .map_err(DetClientError::ThreadError)?;

        info!("Background detection client listening on {}", local_addr);

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
            slot,
            counters,
            local_addr,
        })
    }

    /// The current record, or `None` if no record has ever been decoded.
    pub fn latest(&self) -> Option<Arc<DetectionRecord>> {
        self.slot.load()
    }

    /// Total number of records decoded so far.
    pub fn packet_count(&self) -> u64 {
        self.counters.packet_count.load(Ordering::Relaxed)
    }

    /// Drain counts accumulated by the background thread since the last call.
    pub fn take_report(&self) -> DrainReport {
        let num_decoded = self.counters.num_decoded.swap(0, Ordering::Relaxed);

        DrainReport {
            received_any: num_decoded > 0,
            num_decoded,
            num_malformed: self.counters.num_malformed.swap(0, Ordering::Relaxed),
            hit_cap: self.counters.hit_cap.swap(false, Ordering::Relaxed),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the background thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("Background detection thread panicked");
            }
        }
    }
}

impl Drop for BgDetClient {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, drains the socket until told to stop.
fn bg_thread(
    mut receiver: DetReceiver,
    run: Arc<AtomicBool>,
    counters: Arc<Counters>,
    period: Duration,
) {
    while run.load(Ordering::Relaxed) {
        let report = receiver.drain();

        counters
            .packet_count
            .store(receiver.packet_count(), Ordering::Relaxed);
        counters
            .num_decoded
            .fetch_add(report.num_decoded, Ordering::Relaxed);
        counters
            .num_malformed
            .fetch_add(report.num_malformed, Ordering::Relaxed);
        if report.hit_cap {
            counters.hit_cap.store(true, Ordering::Relaxed);
        }

        // More may be waiting, go straight round again
        if report.hit_cap {
            continue;
        }

        thread::sleep(period);
    }

    debug!("Background detection thread stopped");
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::{net::UdpSocket, time::Instant};

    #[test]
    fn test_bg_receive() {
        let params = NetParams {
            det_endpoint: String::from("127.0.0.1:0"),
            det_bg_poll_period_s: 0.001,
            ..Default::default()
        };
        let mut client = BgDetClient::start(&params).unwrap();
        assert!(client.latest().is_none());

        let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
        tx.send_to(b"not json", client.local_addr()).unwrap();
        tx.send_to(
            br#"{"timestamp": 12.5, "objects": []}"#,
            client.local_addr(),
        )
        .unwrap();

        // Both datagrams are counted, whichever drains they landed in
        let mut total = DrainReport::default();
        let start = Instant::now();
        while (total.num_decoded < 1 || total.num_malformed < 1)
            && start.elapsed() < Duration::from_secs(2)
        {
            let report = client.take_report();
            total.num_decoded += report.num_decoded;
            total.num_malformed += report.num_malformed;
            total.received_any |= report.received_any;
            thread::sleep(Duration::from_millis(5));
        }

        assert!(total.received_any);
        assert_eq!(total.num_decoded, 1);
        assert_eq!(total.num_malformed, 1);
        assert_eq!(client.latest().unwrap().timestamp, 12.5);
        assert_eq!(client.packet_count(), 1);

        // Counts are only reported once
        assert_eq!(client.take_report(), DrainReport::default());

        client.stop();
        assert!(client.bg_jh.is_none());
    }
}
