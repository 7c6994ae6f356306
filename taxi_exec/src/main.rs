//! Main taxi executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Centre the steering and camera
//!     - Main loop:
//!         - Detection ingestion and freshness gating
//!         - Range, frame and line sensor acquisition
//!         - Lane estimation
//!         - Obstacle avoidance and fusion control
//!         - Drive command dispatch
//!         - Telemetry
//!     - On Ctrl+C or at the end of the run: stop, centre the steering and release the car
//!
//! # Modules
//!
//! All processing modules (e.g. `fusion_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
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

// Internal
use comms_if::net::NetParams;
use taxi_lib::{
    car_if::{build_car, build_detector},
    data_store::DataStore,
    det_client::DetClient,
    det_source::{DetSource, DetSourceKind},
    fusion_ctrl::FusionCtrl,
    lane_est::{self, build_lane_est, LaneMode},
    params::{DetRecvMode, TaxiExecParams},
    signal,
    taxi_ctrl::TaxiCtrl,
    tm::{ArchiveTmSink, LogTmSink, TmSink},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    time,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// PiCar-X taxi executable
#[derive(Debug, StructOpt)]
#[structopt(name = "taxi_exec")]
struct Opt {
    /// Stop after running for this many seconds
    #[structopt(long)]
    duration_s: Option<f64>,

    /// Override the lane estimation mode (vision or sensors)
    #[structopt(long)]
    lane_mode: Option<LaneMode>,

    /// Override the detection source (udp, local or off)
    #[structopt(long)]
    det_source: Option<DetSourceKind>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("taxi_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("PiCar-X Taxi Executable\n");
    match host::get_uname() {
        Ok(u) => info!("Running on: {} {} ({})", u.sysname, u.release, u.machine),
        Err(e) => warn!("Could not get host information: {}", e),
    }
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut exec_params: TaxiExecParams =
        util::params::load("taxi_exec.toml").wrap_err("Could not load exec params")?;

    if !(exec_params.cycle_period_s > 0.0 && exec_params.cycle_period_s.is_finite()) {
        return Err(eyre!(
            "The cycle period must be a positive number of seconds, found {}",
            exec_params.cycle_period_s
        ));
    }

    if let Some(m) = opt.lane_mode {
        exec_params.lane_mode = m;
    }
    if let Some(s) = opt.det_source {
        exec_params.det_source = s;
    }

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let lane_params: lane_est::Params =
        util::params::load("lane_est.toml").wrap_err("Could not load lane estimation params")?;

    info!("Exec parameters loaded");
    info!(
        "Lane mode: {:?}, detection source: {:?} ({:?})",
        exec_params.lane_mode, exec_params.det_source, exec_params.det_recv_mode
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    let mut fusion_ctrl = FusionCtrl::default();
    fusion_ctrl
        .init("fusion_ctrl.toml", &session)
        .wrap_err("Failed to initialise FusionCtrl")?;
    info!("FusionCtrl init complete");

    let lane_est = build_lane_est(exec_params.lane_mode, lane_params);
    info!("LaneEst init complete");

    let car = build_car(exec_params.car).wrap_err("Failed to initialise the car")?;

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    let det_source = match exec_params.det_source {
        DetSourceKind::Udp => {
            let background = exec_params.det_recv_mode == DetRecvMode::Background;
            let client = DetClient::new(&net_params, background)
                .wrap_err("Failed to initialise the detection client")?;
            info!(
                "Detection client listening on {}",
                net_params.det_endpoint
            );
            DetSource::Udp(client)
        }
        DetSourceKind::Local => DetSource::Local(build_detector()),
        DetSourceKind::Off => {
            info!("Detections disabled");
            DetSource::Off
        }
    };

    // ---- TELEMETRY SINKS ----

    let mut tm_sinks: Vec<Box<dyn TmSink>> =
        vec![Box::new(LogTmSink::new(exec_params.tm_log_period_cycles))];

    if exec_params.archive_tm {
        tm_sinks.push(Box::new(
            ArchiveTmSink::new(&session).wrap_err("Failed to initialise the telemetry archive")?,
        ));
    }

    // ---- STOP SIGNAL ----

    let stop = Arc::new(AtomicBool::new(false));
    signal::spawn_ctrl_c_handler(stop.clone()).wrap_err("Failed to set the Ctrl+C handler")?;

    // ---- MAIN LOOP ----

    let mut taxi = TaxiCtrl::new(car, det_source, lane_est, fusion_ctrl);
    taxi.startup();

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let run_start = Instant::now();

    info!("Begining main loop\n");

    while !stop.load(Ordering::Relaxed) {
        // Check the run duration
        if let Some(d) = opt.duration_s {
            if run_start.elapsed().as_secs_f64() > d {
                info!("Run duration of {} s reached", d);
                break;
            }
        }

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        ds.cycle_start();

        // ---- CONTROL ----

        match taxi.tick(ds.num_cycles, time::now_epoch_s()) {
            Ok(tm) => ds.tm = Some(tm),
            Err(e) => {
                warn!("Error during control processing, stopping for this cycle: {}", e);
                taxi.fail_safe();
            }
        }

        // ---- TELEMETRY ----

        if let Some(ref tm) = ds.tm {
            for sink in tm_sinks.iter_mut() {
                if let Err(e) = sink.send(tm) {
                    warn!("Telemetry error: {}", e);
                }
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.cycle_on_time();
                thread::sleep(d);
            }
            None => ds.cycle_overrun(
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64(),
                exec_params.max_consec_cycle_overruns,
            ),
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    taxi.shutdown();

    info!(
        "End of execution after {} cycles ({} overruns)",
        ds.num_cycles, ds.num_cycle_overruns
    );

    Ok(())
}
