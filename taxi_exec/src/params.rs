//! # Taxi Executable Parameters
//!
//! This module provide parameters for the taxi executable, loaded from `taxi_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{car_if::CarKind, det_source::DetSourceKind, lane_est::LaneMode};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TaxiExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Which car implementation to drive.
    pub car: CarKind,

    /// Where detections come from.
    pub det_source: DetSourceKind,

    /// How network detections are received.
    pub det_recv_mode: DetRecvMode,

    /// Which lane estimator to use.
    pub lane_mode: LaneMode,

    /// Telemetry is logged once every this many cycles.
    pub tm_log_period_cycles: u64,

    /// Write every telemetry record to the session archive.
    pub archive_tm: bool,

    /// Number of consecutive cycle overruns after which a warning is raised, 0 to disable.
    pub max_consec_cycle_overruns: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How network detections are received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetRecvMode {
    /// Drained once per cycle by the control loop.
    InLoop,

    /// Drained continuously by a background thread.
    Background,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let params: TaxiExecParams = util::params::from_toml_str(
            r#"
            cycle_period_s = 0.1
            car = "sim"
            det_source = "udp"
            det_recv_mode = "in_loop"
            lane_mode = "vision"
            tm_log_period_cycles = 10
            archive_tm = true
            max_consec_cycle_overruns = 50
            "#,
        )
        .unwrap();

        assert_eq!(params.car, CarKind::Sim);
        assert_eq!(params.det_source, DetSourceKind::Udp);
        assert_eq!(params.det_recv_mode, DetRecvMode::InLoop);
        assert_eq!(params.lane_mode, LaneMode::Vision);
    }
}
