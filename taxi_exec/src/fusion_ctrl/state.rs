//! Implementations for the FusionCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{FusionCtrlError, Params};
use crate::obs_avoid::{AvoidancePlan, ObsAction, ObsAvoid, ObstacleDecision};
use comms_if::eqpt::{
    det::DetectedObject,
    mech::{DriveCmd, DriveDem, MAX_SPEED, STEER_CENTRE_DEG},
};
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fusion control module state
#[derive(Default)]
pub struct FusionCtrl {
    pub(crate) params: Params,

    obs_avoid: ObsAvoid,
}

/// Input data to FusionCtrl.
#[derive(Default)]
pub struct InputData {
    /// Objects from a usable detection record, empty if there is none.
    pub objects: Vec<DetectedObject>,

    /// Ultrasonic range, zero or negative on sensor timeout.
    ///
    /// Units: centimeters
    pub distance_cm: f64,

    /// Steering offset from lane estimation.
    ///
    /// Units: degrees
    pub lane_offset_deg: i32,
}

/// Status report for FusionCtrl processing.
#[derive(Clone, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The obstacle decision for this cycle.
    pub decision: ObstacleDecision,

    /// The steering angle had to be limited.
    pub steer_limited: bool,

    /// The manoeuvre planned around the ranged obstacle. Reported only, the drive command does not
    /// follow it.
    pub avoidance: AvoidancePlan,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for FusionCtrl {
    type InitData = &'static str;
    type InitError = FusionCtrlError;

    type InputData = InputData;
    type OutputData = DriveCmd;
    type StatusReport = StatusReport;
    type ProcError = FusionCtrlError;

    /// Initialise the FusionCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data)?;
        *self = Self::new(params)?;

        Ok(())
    }

    /// Perform cyclic processing of FusionCtrl.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let decision = self
            .obs_avoid
            .decide(input_data.distance_cm, &input_data.objects);

        let (cmd, steer_limited) = self.drive_cmd(&decision, input_data.lane_offset_deg);
        let avoidance = self
            .obs_avoid
            .plan_avoidance(input_data.distance_cm, input_data.lane_offset_deg);

        trace!(
            "FusionCtrl: {} ({}), steer {} deg, speed {}",
            decision.action,
            decision.reason,
            cmd.steer_angle_deg,
            cmd.speed()
        );

        Ok((
            cmd,
            StatusReport {
                decision,
                steer_limited,
                avoidance,
            },
        ))
    }
}

impl FusionCtrl {
    /// Create a new instance from the given parameters.
    pub fn new(params: Params) -> Result<Self, FusionCtrlError> {
        if !(params.steer_min_deg <= STEER_CENTRE_DEG && STEER_CENTRE_DEG <= params.steer_max_deg) {
            return Err(FusionCtrlError::InvalidSteerLimits(
                params.steer_min_deg,
                params.steer_max_deg,
            ));
        }

        if !(params.staleness_budget_s > 0.0) {
            return Err(FusionCtrlError::InvalidStalenessBudget(
                params.staleness_budget_s,
            ));
        }

        let obs_avoid = ObsAvoid::new(params.obs_avoid.clone())?;

        Ok(Self { params, obs_avoid })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Build the drive command for a decision and lane offset.
    ///
    /// Returns the command and whether the steering angle was limited.
    fn drive_cmd(&self, decision: &ObstacleDecision, lane_offset_deg: i32) -> (DriveCmd, bool) {
        let raw_angle = STEER_CENTRE_DEG.saturating_add(lane_offset_deg);
        let steer_angle_deg = raw_angle.clamp(self.params.steer_min_deg, self.params.steer_max_deg);

        let drive = match decision.action {
            ObsAction::Stop => DriveDem::Stop,
            ObsAction::Slow | ObsAction::Clear => {
                let speed = (self.params.base_speed as f64 * decision.speed_factor).round();
                DriveDem::Forward(speed.max(0.0).min(MAX_SPEED as f64) as u8)
            }
        };

        (
            DriveCmd {
                drive,
                steer_angle_deg,
            },
            steer_angle_deg != raw_angle,
        )
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::det::BBox;

    fn fusion() -> FusionCtrl {
        FusionCtrl::new(Params::default()).unwrap()
    }

    fn input(distance_cm: f64, lane_offset_deg: i32) -> InputData {
        InputData {
            objects: vec![],
            distance_cm,
            lane_offset_deg,
        }
    }

    #[test]
    fn test_clear_drive() {
        let (cmd, rpt) = fusion().proc(&input(100.0, 10)).unwrap();

        assert_eq!(cmd.drive, DriveDem::Forward(40));
        assert_eq!(cmd.steer_angle_deg, 100);
        assert_eq!(rpt.decision.action, ObsAction::Clear);
        assert!(!rpt.steer_limited);
        assert_eq!(
            rpt.avoidance,
            AvoidancePlan {
                steer_offset_deg: 10,
                speed: 50
            }
        );
    }

    #[test]
    fn test_stop_keeps_steering() {
        let (cmd, rpt) = fusion().proc(&input(10.0, -20)).unwrap();

        assert_eq!(cmd.drive, DriveDem::Stop);
        assert_eq!(cmd.steer_angle_deg, 70);
        assert_eq!(rpt.decision.action, ObsAction::Stop);

        // Hard turn away from the obstacle, on the side of the lane offset
        assert_eq!(
            rpt.avoidance,
            AvoidancePlan {
                steer_offset_deg: -45,
                speed: 0
            }
        );
    }

    #[test]
    fn test_slow_speed_rounding() {
        // 40 * 10/15 = 26.67 rounds up
        let (cmd, _) = fusion().proc(&input(25.0, 0)).unwrap();
        assert_eq!(cmd.drive, DriveDem::Forward(27));

        // Hazard in path halves the speed
        let mut data = input(-1.0, 0);
        data.objects.push(DetectedObject {
            label: String::from("dog"),
            score: 0.9,
            bbox: BBox::from([300.0, 200.0, 340.0, 260.0]),
        });
        let (cmd, rpt) = fusion().proc(&data).unwrap();
        assert_eq!(cmd.drive, DriveDem::Forward(20));
        assert!(rpt.decision.reason.contains("dog"));
    }

    #[test]
    fn test_steer_limits() {
        let mut f = fusion();

        let (cmd, rpt) = f.proc(&input(100.0, 60)).unwrap();
        assert_eq!(cmd.steer_angle_deg, 135);
        assert!(rpt.steer_limited);

        let (cmd, _) = f.proc(&input(100.0, -60)).unwrap();
        assert_eq!(cmd.steer_angle_deg, 45);

        let (cmd, _) = f.proc(&input(100.0, i32::MIN)).unwrap();
        assert_eq!(cmd.steer_angle_deg, 45);
    }

    #[test]
    fn test_invalid_params() {
        let mut p = Params::default();
        p.steer_min_deg = 95;
        assert!(matches!(
            FusionCtrl::new(p),
            Err(FusionCtrlError::InvalidSteerLimits(95, 135))
        ));

        let mut p = Params::default();
        p.staleness_budget_s = 0.0;
        assert!(FusionCtrl::new(p).is_err());
    }
}
