//! # Fusion Control module
//!
//! Combines the obstacle decision and the lane offset into the single drive command issued to the
//! car each cycle:
//!
//! - steering angle = `clamp(90 + lane offset, 45, 135)`
//! - speed = `round(base speed * decision speed factor)`
//! - a stop decision stops the drive but still applies the steering angle.
//!
//! Each cycle is computed only from that cycle's inputs.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

use crate::obs_avoid::ObsAvoidError;
use util::params::LoadError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during FusionCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum FusionCtrlError {
    #[error("Could not load the fusion control parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid obstacle avoidance parameters: {0}")]
    ObsAvoidError(#[from] ObsAvoidError),

    #[error("The steering limits [{0}, {1}] do not contain the centre angle")]
    InvalidSteerLimits(i32, i32),

    #[error("The staleness budget must be positive, got {0} s")]
    InvalidStalenessBudget(f64),
}
