//! Parameters structure for ObsAvoid

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the obstacle avoidance policy.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- RANGE ----

    /// Range below which the car starts slowing down.
    ///
    /// Units: centimeters
    pub safe_distance_cm: f64,

    /// Range below which the car stops.
    ///
    /// Units: centimeters
    pub critical_distance_cm: f64,

    /// Lowest speed factor used while slowing for a close obstacle.
    pub min_slow_factor: f64,

    // ---- DETECTIONS ----

    /// Detections must score strictly above this to be treated as hazards.
    pub det_score_threshold: f64,

    /// Speed factor applied when a hazard is detected in the path.
    pub det_slow_factor: f64,

    /// Width of the frames the detector runs on.
    ///
    /// Units: pixels
    pub frame_width_px: f64,

    /// Exclusive bounds of the band of the frame, as fractions of its width, in which a detection
    /// is considered to be in the car's path.
    pub path_band: [f64; 2],

    /// Labels treated as hazards.
    pub hazard_labels: Vec<String>,

    // ---- AVOIDANCE ----

    /// Steering offset used to turn away from a critical obstacle.
    ///
    /// Units: degrees
    pub avoid_hard_steer_deg: i32,

    /// Offset added to the steering while gently avoiding an obstacle.
    ///
    /// Units: degrees
    pub avoid_nudge_deg: i32,

    /// Limit on the steering offset while gently avoiding an obstacle.
    ///
    /// Units: degrees
    pub avoid_nudge_limit_deg: i32,

    /// Drive speed while gently avoiding an obstacle.
    pub avoid_slow_speed: u8,

    /// Drive speed when no avoidance is needed.
    pub avoid_cruise_speed: u8,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            safe_distance_cm: 30.0,
            critical_distance_cm: 15.0,
            min_slow_factor: 0.3,
            det_score_threshold: 0.6,
            det_slow_factor: 0.5,
            frame_width_px: 640.0,
            path_band: [0.25, 0.75],
            hazard_labels: ["person", "car", "bicycle", "motorcycle", "dog", "cat"]
                .iter()
                .map(|s| String::from(*s))
                .collect(),
            avoid_hard_steer_deg: 45,
            avoid_nudge_deg: 15,
            avoid_nudge_limit_deg: 30,
            avoid_slow_speed: 30,
            avoid_cruise_speed: 50,
        }
    }
}
