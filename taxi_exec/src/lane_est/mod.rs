//! # Lane Estimation module
//!
//! Produces a steering offset which keeps the car in its lane. Two estimators are available and
//! both implement [`LaneEstimator`]:
//!
//! - [`VisionLaneEst`] finds the lane lines in a camera frame.
//! - [`SensorLaneEst`] uses the three line tracking sensors under the car.
//!
//! Both are pure functions of their input, nothing is carried over between cycles.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod edges;
mod hough;
mod params;
mod sensors;
mod vision;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::str::FromStr;

use image::RgbImage;
use serde::Deserialize;

use comms_if::eqpt::sens::LinePosition;

pub use edges::*;
pub use hough::*;
pub use params::*;
pub use sensors::*;
pub use vision::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which can produce a steering offset from the car's view of the lane.
pub trait LaneEstimator {
    /// Which inputs this estimator needs.
    fn mode(&self) -> LaneMode;

    /// Estimate the steering offset in degrees, negative to steer left.
    fn estimate(&self, inputs: &LaneInputs) -> i32;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Inputs to lane estimation for one cycle.
pub struct LaneInputs<'a> {
    /// Camera frame, if one was captured.
    pub frame: Option<&'a RgbImage>,

    /// Line tracking sensor reading.
    pub line_position: LinePosition,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneMode {
    /// Lane lines found in the camera frame.
    Vision,

    /// Line tracking sensors.
    Sensors,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FromStr for LaneMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vision" => Ok(LaneMode::Vision),
            "sensors" => Ok(LaneMode::Sensors),
            _ => Err(format!(
                "Unknown lane mode \"{}\", expected \"vision\" or \"sensors\"",
                s
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the estimator for the given mode.
pub fn build_lane_est(mode: LaneMode, params: Params) -> Box<dyn LaneEstimator> {
    match mode {
        LaneMode::Vision => Box::new(VisionLaneEst::new(params)),
        LaneMode::Sensors => Box::new(SensorLaneEst::new(params.sensor_offset_deg)),
    }
}
