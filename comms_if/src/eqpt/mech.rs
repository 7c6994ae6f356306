//! # Mechanisms Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Steering servo angle which points the front wheels straight ahead.
///
/// Units: degrees
pub const STEER_CENTRE_DEG: i32 = 90;

/// Minimum steering servo angle.
///
/// Units: degrees
pub const STEER_MIN_DEG: i32 = 45;

/// Maximum steering servo angle.
///
/// Units: degrees
pub const STEER_MAX_DEG: i32 = 135;

/// Maximum drive speed accepted by the motors.
pub const MAX_SPEED: u8 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single drive demand issued to the car once per cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveCmd {
    /// What the drive motors should do.
    pub drive: DriveDem,

    /// Steering servo angle, 90 is straight ahead.
    ///
    /// Units: degrees
    pub steer_angle_deg: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Demand for the drive motors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveDem {
    /// Stop both motors.
    Stop,

    /// Drive forwards at the given speed (0 to 100).
    Forward(u8),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl DriveCmd {
    /// A full stop with the wheels straight.
    pub fn stop() -> Self {
        Self {
            drive: DriveDem::Stop,
            steer_angle_deg: STEER_CENTRE_DEG,
        }
    }

    /// Drive speed of this command, zero if stopped.
    pub fn speed(&self) -> u8 {
        match self.drive {
            DriveDem::Stop => 0,
            DriveDem::Forward(s) => s,
        }
    }
}

impl Default for DriveCmd {
    fn default() -> Self {
        Self::stop()
    }
}
