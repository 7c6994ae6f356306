//! # Taxi library.
//!
//! This library allows other crates in the workspace to access items defined inside the taxi
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Car interface - actuation and sensing capabilities, with simulated and null cars
pub mod car_if;

/// Data store - cycle management and monitoring counters for the executable
pub mod data_store;

/// Detection client - receives detection records from the remote detector
pub mod det_client;

/// Detection source - selects where detected objects come from each cycle
pub mod det_source;

/// Fusion control - combines obstacle and lane information into one drive command
pub mod fusion_ctrl;

/// Lane estimation - steering offset from the camera or line sensors
pub mod lane_est;

/// Obstacle avoidance - decides whether to stop, slow or drive on
pub mod obs_avoid;

/// Executable parameters
pub mod params;

/// Stop signal handling
pub mod signal;

/// Taxi control - runs one control cycle
pub mod taxi_ctrl;

/// Telemetry records and sinks
pub mod tm;
