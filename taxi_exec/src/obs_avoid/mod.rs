//! # Obstacle Avoidance module
//!
//! Decides how cautiously the taxi must drive given the ultrasonic range to the nearest obstacle
//! and the objects reported by the detector. Range rules always take priority over detections:
//!
//! 1. A valid range below the critical distance stops the car.
//! 2. A valid range below the safe distance slows the car along a linear ramp, floored so that the
//!    car keeps crawling.
//! 3. A confident hazard detected in the middle of the frame slows the car.
//! 4. Otherwise the path is clear.
//!
//! An invalid range (the sensor timed out) skips the range rules entirely and relies on the
//! detections instead.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The outcome of one obstacle check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObstacleDecision {
    pub action: ObsAction,

    /// Human readable reason for the action.
    pub reason: String,

    /// Multiplier applied to the base drive speed, between 0 and 1.
    pub speed_factor: f64,
}

/// An avoidance manoeuvre relative to the current steering offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AvoidancePlan {
    /// Steering offset from straight ahead.
    ///
    /// Units: degrees
    pub steer_offset_deg: i32,

    /// Drive speed, 0 to 100.
    pub speed: u8,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ObsAvoid operation.
#[derive(Debug, thiserror::Error)]
pub enum ObsAvoidError {
    #[error("The critical distance ({0} cm) must be positive and below the safe distance ({1} cm)")]
    InvalidDistances(f64, f64),

    #[error("The frame width must be positive, got {0} px")]
    InvalidFrameWidth(f64),

    #[error("The path band {0:?} is not an increasing pair of fractions")]
    InvalidPathBand([f64; 2]),
}

/// Action the car must take, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObsAction {
    Stop,
    Slow,
    Clear,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObstacleDecision {
    pub(crate) fn stop(reason: String) -> Self {
        Self {
            action: ObsAction::Stop,
            reason,
            speed_factor: 0.0,
        }
    }

    pub(crate) fn slow(reason: String, speed_factor: f64) -> Self {
        Self {
            action: ObsAction::Slow,
            reason,
            speed_factor,
        }
    }

    pub(crate) fn clear() -> Self {
        Self {
            action: ObsAction::Clear,
            reason: String::from("No obstacles"),
            speed_factor: 1.0,
        }
    }
}

impl Default for ObstacleDecision {
    fn default() -> Self {
        Self::clear()
    }
}

impl std::fmt::Display for ObsAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObsAction::Stop => "STOP",
            ObsAction::Slow => "SLOW",
            ObsAction::Clear => "CLEAR",
        };
        write!(f, "{}", s)
    }
}
