//! # Detection Monitor
//!
//! Listens to the detection feed and reacts with the simplest possible policy: stop whenever no
//! usable record is available, steer slightly left while anything is detected and straight ahead
//! otherwise. The current record is logged periodically.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

use comms_if::{eqpt::mech::STEER_CENTRE_DEG, net::NetParams};
use taxi_lib::{
    car_if::{build_car, CarKind},
    det_client::{freshness, DetReceiver},
    signal,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
    time,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Steering offset used while objects are detected.
///
/// Units: degrees
const DETECTED_STEER_OFFSET_DEG: i32 = -10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "det_monitor")]
struct Opt {
    /// Car to drive (sim or null)
    #[structopt(long, default_value = "sim")]
    car: CarKind,

    /// Loop period in seconds
    #[structopt(long, default_value = "0.05")]
    period_s: f64,

    /// Period between logs of the current record in seconds
    #[structopt(long, default_value = "0.5")]
    log_period_s: f64,

    /// Maximum age of a usable record in seconds
    #[structopt(long, default_value = "0.5")]
    stale_after_s: f64,

    /// Stop after running for this many seconds
    #[structopt(long)]
    duration_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();
    let period = loop_period(opt.period_s)?;

    let session =
        Session::new("det_monitor", "sessions").wrap_err("Failed to create the session")?;
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("PiCar-X Detection Monitor\n");

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let mut receiver =
        DetReceiver::new(&net_params).wrap_err("Failed to initialise the detection receiver")?;
    info!("Listening on {}", net_params.det_endpoint);

    let mut car = build_car(opt.car).wrap_err("Failed to initialise the car")?;
    car.center_steering();

    let stop = Arc::new(AtomicBool::new(false));
    signal::spawn_ctrl_c_handler(stop.clone()).wrap_err("Failed to set the Ctrl+C handler")?;

    let run_start = Instant::now();
    let mut last_log: Option<Instant> = None;

    while !stop.load(Ordering::Relaxed) {
        if let Some(d) = opt.duration_s {
            if run_start.elapsed().as_secs_f64() > d {
                break;
            }
        }

        let cycle_start = Instant::now();

        receiver.drain();
        let record = freshness::usable(receiver.latest(), time::now_epoch_s(), opt.stale_after_s);

        // Periodic log of the current record
        let log_due = match last_log {
            Some(t) => t.elapsed().as_secs_f64() > opt.log_period_s,
            None => true,
        };
        if log_due {
            match record {
                Some(ref r) => match serde_json::to_string_pretty(&**r) {
                    Ok(s) => info!("Detection update ({} packets):\n{}", receiver.packet_count(), s),
                    Err(e) => warn!("Could not format the record: {}", e),
                },
                None => info!("No detections (missing or stale)"),
            }
            last_log = Some(Instant::now());
        }

        match record {
            None => car.stop(),
            Some(r) if !r.objects.is_empty() => {
                car.set_steering_angle(STEER_CENTRE_DEG + DETECTED_STEER_OFFSET_DEG)
            }
            Some(_) => car.set_steering_angle(STEER_CENTRE_DEG),
        }

        if let Some(d) = period.checked_sub(cycle_start.elapsed()) {
            thread::sleep(d);
        }
    }

    car.stop();
    car.center_steering();
    car.release();

    info!("Detection monitor stopped after receiving {} records", receiver.packet_count());

    Ok(())
}

/// Convert the loop period option into a duration, rejecting negative or non-finite values.
fn loop_period(period_s: f64) -> Result<Duration> {
    if !(period_s >= 0.0 && period_s.is_finite()) {
        return Err(eyre!(
            "The loop period must be a non-negative number of seconds, found {}",
            period_s
        ));
    }

    Ok(Duration::from_secs_f64(period_s))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_loop_period() {
        assert_eq!(loop_period(0.05).unwrap(), Duration::from_millis(50));
        assert_eq!(loop_period(0.0).unwrap(), Duration::from_secs(0));

        assert!(loop_period(f64::INFINITY).is_err());
        assert!(loop_period(f64::NAN).is_err());
        assert!(loop_period(-0.1).is_err());
    }
}
