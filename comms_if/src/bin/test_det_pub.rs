//! Detection publisher test
//!
//! Sends synthetic detection records to the taxi's detection receiver so the ingestion and
//! fusion can be exercised without the remote detector.

use chrono::Utc;
use comms_if::eqpt::det::{BBox, DetectedObject, DetectionRecord};
use serde_json::json;
use std::net::UdpSocket;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "test_det_pub", about = "Publish synthetic detection records over UDP")]
struct Opt {
    /// Endpoint to send records to
    #[structopt(long, default_value = "127.0.0.1:5005")]
    target: String,

    /// Publishing rate
    #[structopt(long, default_value = "10")]
    rate_hz: f64,

    /// Label of the object placed in the middle of the frame, no object if not given
    #[structopt(long)]
    label: Option<String>,

    /// Score of the published object
    #[structopt(long, default_value = "0.8")]
    score: f64,

    /// Send a malformed datagram every N records (0 to disable)
    #[structopt(long, default_value = "0")]
    malformed_every: u64,

    /// Age added to each timestamp, use to exercise the staleness policy
    #[structopt(long, default_value = "0")]
    delay_s: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    // Bind to any free local port
    let socket = UdpSocket::bind("0.0.0.0:0")?;

    println!(
        "Publishing detections to {} at {} Hz",
        opt.target, opt.rate_hz
    );

    let period = Duration::from_secs_f64(1.0 / opt.rate_hz.max(0.1));
    let mut frame_id: u64 = 0;

    loop {
        if opt.malformed_every > 0 && frame_id % opt.malformed_every == 0 {
            if let Err(e) = socket.send_to(b"{\"objects\": [", &opt.target) {
                println!("Failed to send malformed datagram: {}", e)
            }
        }

        let now = Utc::now();
        let timestamp = now.timestamp_millis() as f64 * 0.001 - opt.delay_s;

        let objects = match opt.label {
            Some(ref label) => vec![DetectedObject {
                label: label.clone(),
                score: opt.score,
                bbox: BBox::from([280.0, 100.0, 360.0, 400.0]),
            }],
            None => Vec::new(),
        };

        let record = DetectionRecord {
            timestamp,
            frame_id: Some(json!(frame_id)),
            objects,
        };

        match socket.send_to(&record.to_json_bytes()?, &opt.target) {
            Ok(_) => (),
            Err(e) => println!("Failed to send record {}: {}", frame_id, e),
        }

        frame_id += 1;
        std::thread::sleep(period);
    }
}
