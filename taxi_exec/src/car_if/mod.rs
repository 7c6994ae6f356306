//! # Car Interface
//!
//! Capability interfaces for the hardware the control loop drives. The loop only ever talks to a
//! `dyn Car` and a `dyn ObjectDetector`, which implementation sits behind them is chosen once at
//! startup from the parameters:
//!
//! - [`SimCar`] is a simple simulated car which renders a synthetic lane and closes on an obstacle
//!   while driving forwards.
//! - [`NullCar`] accepts every command and reports no sensor data, as if all hardware were
//!   missing.
//!
//! Sensor reads never block and never fail. A ranging timeout is reported as a non-positive
//! distance, a missing camera as no frame.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod detector;
mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::str::FromStr;

use image::RgbImage;
use log::{info, trace};
use serde::Deserialize;

use comms_if::eqpt::{
    mech::STEER_CENTRE_DEG,
    sens::{LinePosition, DISTANCE_TIMEOUT_CM},
};
use util::params::{self, LoadError};

pub use detector::*;
pub use sim::*;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Actuation and sensing provided by the car.
pub trait Car {
    /// Drive forwards at the given speed, 0 to 100.
    fn forward(&mut self, speed: u8);

    /// Stop the drive motors.
    fn stop(&mut self);

    /// Set the steering servo angle, 90 is straight ahead.
    fn set_steering_angle(&mut self, angle_deg: i32);

    /// Point the wheels straight ahead.
    fn center_steering(&mut self) {
        self.set_steering_angle(STEER_CENTRE_DEG);
    }

    /// Point the camera straight ahead.
    fn center_camera(&mut self);

    /// Range to the nearest obstacle ahead in centimeters, zero or negative on sensor timeout.
    fn get_distance(&mut self) -> f64;

    /// Capture a frame from the camera, `None` if no camera is available.
    fn capture_frame(&mut self) -> Option<RgbImage>;

    /// Position of the line under the car as seen by the line tracking sensors.
    fn get_line_position(&mut self) -> LinePosition;

    /// Release all actuators. No further commands are expected after this.
    fn release(&mut self);
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which car implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarKind {
    Sim,
    Null,
}

#[derive(Debug, thiserror::Error)]
pub enum CarIfError {
    #[error("Could not load the simulated car parameters: {0}")]
    SimParamsError(#[from] LoadError),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A car with no hardware.
#[derive(Debug, Default)]
pub struct NullCar;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FromStr for CarKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sim" => Ok(CarKind::Sim),
            "null" => Ok(CarKind::Null),
            _ => Err(format!("Unknown car \"{}\", expected \"sim\" or \"null\"", s)),
        }
    }
}

impl Car for NullCar {
    fn forward(&mut self, speed: u8) {
        trace!("NullCar: forward({})", speed);
    }

    fn stop(&mut self) {
        trace!("NullCar: stop");
    }

    fn set_steering_angle(&mut self, angle_deg: i32) {
        trace!("NullCar: steering {} deg", angle_deg);
    }

    fn center_camera(&mut self) {}

    fn get_distance(&mut self) -> f64 {
        DISTANCE_TIMEOUT_CM
    }

    fn capture_frame(&mut self) -> Option<RgbImage> {
        None
    }

    fn get_line_position(&mut self) -> LinePosition {
        LinePosition::Absent
    }

    fn release(&mut self) {
        trace!("NullCar: released");
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the car selected by `kind`.
///
/// The simulated car loads its parameters from `sim_car.toml`.
pub fn build_car(kind: CarKind) -> Result<Box<dyn Car>, CarIfError> {
    match kind {
        CarKind::Sim => {
            let params: SimCarParams = params::load("sim_car.toml")?;
            info!("Using the simulated car");
            Ok(Box::new(SimCar::new(params)))
        }
        CarKind::Null => {
            info!("Using the null car, no sensor data will be available");
            Ok(Box::new(NullCar))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_null_car() {
        let mut car = NullCar;

        car.forward(50);
        car.center_steering();

        assert!(car.get_distance() <= 0.0);
        assert!(car.capture_frame().is_none());
        assert_eq!(car.get_line_position(), LinePosition::Absent);
    }
}
