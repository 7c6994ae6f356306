//! Parameters structure for FusionCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::{det_client::freshness::DEFAULT_STALENESS_BUDGET_S, obs_avoid};
use comms_if::eqpt::mech::{STEER_MAX_DEG, STEER_MIN_DEG};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for fusion control, loaded from `fusion_ctrl.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Speed driven with a clear path, 0 to 100.
    pub base_speed: u8,

    /// Maximum age of a usable detection record.
    ///
    /// Units: seconds
    pub staleness_budget_s: f64,

    /// Steering servo limits.
    ///
    /// Units: degrees
    pub steer_min_deg: i32,
    pub steer_max_deg: i32,

    /// Obstacle avoidance policy.
    pub obs_avoid: obs_avoid::Params,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            base_speed: 40,
            staleness_budget_s: DEFAULT_STALENESS_BUDGET_S,
            steer_min_deg: STEER_MIN_DEG,
            steer_max_deg: STEER_MAX_DEG,
            obs_avoid: obs_avoid::Params::default(),
        }
    }
}
