//! Line tracking sensor lane estimator

use comms_if::eqpt::sens::LinePosition;

use super::{LaneEstimator, LaneInputs, LaneMode};

/// Default steering offset when the line is under a side sensor.
///
/// Units: degrees
pub const DEFAULT_SENSOR_OFFSET_DEG: i32 = 30;

/// Steers towards whichever side sensor sees the line.
#[derive(Debug, Clone)]
pub struct SensorLaneEst {
    offset_deg: i32,
}

impl SensorLaneEst {
    pub fn new(offset_deg: i32) -> Self {
        Self { offset_deg }
    }
}

impl LaneEstimator for SensorLaneEst {
    fn mode(&self) -> LaneMode {
        LaneMode::Sensors
    }

    fn estimate(&self, inputs: &LaneInputs) -> i32 {
        line_sensor_offset(inputs.line_position, self.offset_deg)
    }
}

/// Steering offset for a line tracking reading using the default offset.
///
/// A lost line keeps the car straight.
pub fn follow_line_sensors(position: LinePosition) -> i32 {
    line_sensor_offset(position, DEFAULT_SENSOR_OFFSET_DEG)
}

/// Steering offset for a line tracking reading.
pub fn line_sensor_offset(position: LinePosition, offset_deg: i32) -> i32 {
    match position {
        LinePosition::Left => -offset_deg,
        LinePosition::Right => offset_deg,
        LinePosition::Centre | LinePosition::Absent => 0,
    }
}
