//! # Sensor Equipment Readings
//!
//! Readings taken from the car's ultrasonic ranger and the three grayscale line tracking
//! sensors.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Value returned by the ultrasonic ranger when no echo was received before its timeout.
///
/// Any reading less than or equal to zero is treated as a timeout.
pub const DISTANCE_TIMEOUT_CM: f64 = -1.0;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Position of the line under the car as seen by the grayscale sensors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePosition {
    /// The line is under the left sensor.
    Left,

    /// The line is under the centre sensor.
    Centre,

    /// The line is under the right sensor.
    Right,

    /// No sensor can see the line.
    Absent,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LinePosition {
    /// Decode the three sensor levels into a line position.
    ///
    /// A level of `0` means the sensor sees the (dark) line. The centre sensor takes priority,
    /// followed by the left and then the right.
    pub fn from_sensors(left: u8, centre: u8, right: u8) -> Self {
        if centre == 0 {
            LinePosition::Centre
        } else if left == 0 {
            LinePosition::Left
        } else if right == 0 {
            LinePosition::Right
        } else {
            LinePosition::Absent
        }
    }
}

/// Returns the distance if it is a valid (positive) reading, or `None` for a timeout.
pub fn valid_distance(distance_cm: f64) -> Option<f64> {
    if distance_cm.is_finite() && distance_cm > 0.0 {
        Some(distance_cm)
    } else {
        None
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_position_from_sensors() {
        assert_eq!(LinePosition::from_sensors(0, 0, 0), LinePosition::Centre);
        assert_eq!(LinePosition::from_sensors(0, 1, 0), LinePosition::Left);
        assert_eq!(LinePosition::from_sensors(1, 1, 0), LinePosition::Right);
        assert_eq!(LinePosition::from_sensors(1, 1, 1), LinePosition::Absent);
    }

    #[test]
    fn test_valid_distance() {
        assert_eq!(valid_distance(12.5), Some(12.5));
        assert_eq!(valid_distance(DISTANCE_TIMEOUT_CM), None);
        assert_eq!(valid_distance(0.0), None);
        assert_eq!(valid_distance(std::f64::NAN), None);
    }
}
