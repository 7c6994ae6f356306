//! Implementations for the ObsAvoid state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{AvoidancePlan, ObsAvoidError, ObstacleDecision, Params};
use comms_if::eqpt::{det::DetectedObject, sens::valid_distance};
use util::{maths::lin_map, module::State, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Obstacle avoidance module state
#[derive(Default)]
pub struct ObsAvoid {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
}

/// Input data to ObsAvoid.
#[derive(Default)]
pub struct InputData {
    /// Ultrasonic range, zero or negative if the sensor timed out.
    ///
    /// Units: centimeters
    pub distance_cm: f64,

    /// Objects from the current detection record, empty if there is none.
    pub objects: Vec<DetectedObject>,
}

/// Status report for ObsAvoid processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The range reading was valid and used.
    pub range_valid: bool,

    /// Index of the detection which triggered a slow down, if any.
    pub hazard_index: Option<usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ObsAvoid {
    type InitData = Params;
    type InitError = ObsAvoidError;

    type InputData = InputData;
    type OutputData = ObstacleDecision;
    type StatusReport = StatusReport;
    type ProcError = ObsAvoidError;

    /// Initialise the ObsAvoid module.
    ///
    /// The parameters are normally a sub-table of the fusion control parameter file.
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        *self = Self::new(init_data)?;
        Ok(())
    }

    /// Perform cyclic processing of ObsAvoid.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let decision = self.decide(input_data.distance_cm, &input_data.objects);

        Ok((decision, self.report))
    }
}

impl ObsAvoid {
    /// Create a new instance from the given parameters.
    pub fn new(params: Params) -> Result<Self, ObsAvoidError> {
        if !(params.critical_distance_cm > 0.0
            && params.critical_distance_cm < params.safe_distance_cm)
        {
            return Err(ObsAvoidError::InvalidDistances(
                params.critical_distance_cm,
                params.safe_distance_cm,
            ));
        }

        if !(params.frame_width_px > 0.0) {
            return Err(ObsAvoidError::InvalidFrameWidth(params.frame_width_px));
        }

        let [lo, hi] = params.path_band;
        if !(0.0 <= lo && lo < hi && hi <= 1.0) {
            return Err(ObsAvoidError::InvalidPathBand(params.path_band));
        }

        Ok(Self {
            params,
            report: StatusReport::default(),
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Decide what to do given the range to the nearest obstacle and the current detections.
    pub fn decide(&mut self, distance_cm: f64, objects: &[DetectedObject]) -> ObstacleDecision {
        self.report = StatusReport::default();

        if let Some(d) = valid_distance(distance_cm) {
            self.report.range_valid = true;

            if d < self.params.critical_distance_cm {
                return ObstacleDecision::stop(format!("Obstacle at {:.1}cm", d));
            }

            if d < self.params.safe_distance_cm {
                let ramp = lin_map(
                    (self.params.critical_distance_cm, self.params.safe_distance_cm),
                    (0.0, 1.0),
                    d,
                );
                return ObstacleDecision::slow(
                    format!("Approaching obstacle at {:.1}cm", d),
                    ramp.max(self.params.min_slow_factor),
                );
            }
        }

        if let Some((i, obj)) = objects
            .iter()
            .enumerate()
            .find(|(_, o)| self.is_hazard_in_path(o))
        {
            trace!("Hazard {} ({:.2}) in path", obj.label, obj.score);
            self.report.hazard_index = Some(i);
            return ObstacleDecision::slow(
                format!("{} detected in path", obj.label),
                self.params.det_slow_factor,
            );
        }

        ObstacleDecision::clear()
    }

    /// Plan a steering manoeuvre around an obstacle at the given range.
    ///
    /// An invalid range plans no avoidance.
    pub fn plan_avoidance(&self, distance_cm: f64, steer_offset_deg: i32) -> AvoidancePlan {
        let cruise = AvoidancePlan {
            steer_offset_deg,
            speed: self.params.avoid_cruise_speed,
        };

        let d = match valid_distance(distance_cm) {
            Some(d) => d,
            None => return cruise,
        };

        if d < self.params.critical_distance_cm {
            let hard = self.params.avoid_hard_steer_deg;
            AvoidancePlan {
                steer_offset_deg: if steer_offset_deg >= 0 { hard } else { -hard },
                speed: 0,
            }
        } else if d < self.params.safe_distance_cm {
            let limit = self.params.avoid_nudge_limit_deg;
            AvoidancePlan {
                steer_offset_deg: (steer_offset_deg + self.params.avoid_nudge_deg)
                    .clamp(-limit, limit),
                speed: self.params.avoid_slow_speed,
            }
        } else {
            cruise
        }
    }

    /// True if the object is a confident hazard whose centre is inside the path band.
    fn is_hazard_in_path(&self, obj: &DetectedObject) -> bool {
        let frac = obj.bbox.center_x() / self.params.frame_width_px;
        let [lo, hi] = self.params.path_band;

        obj.score > self.params.det_score_threshold
            && lo < frac
            && frac < hi
            && self.params.hazard_labels.iter().any(|l| *l == obj.label)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::obs_avoid::ObsAction;
    use comms_if::eqpt::det::BBox;

    fn obs_avoid() -> ObsAvoid {
        ObsAvoid::new(Params::default()).unwrap()
    }

    fn object(label: &str, score: f64, bbox: [f64; 4]) -> DetectedObject {
        DetectedObject {
            label: String::from(label),
            score,
            bbox: BBox::from(bbox),
        }
    }

    fn person_in_path() -> DetectedObject {
        object("person", 0.8, [280.0, 100.0, 360.0, 400.0])
    }

    #[test]
    fn test_critical_stop() {
        let mut oa = obs_avoid();

        let d = oa.decide(10.0, &[]);
        assert_eq!(d.action, ObsAction::Stop);
        assert_eq!(d.speed_factor, 0.0);
        assert!(d.reason.contains("10.0"));

        // Detections never override a stop
        for dist in &[0.1, 5.0, 14.99] {
            let d = oa.decide(*dist, &[person_in_path()]);
            assert_eq!(d.action, ObsAction::Stop);
            assert_eq!(d.speed_factor, 0.0);
        }
    }

    #[test]
    fn test_slow_ramp() {
        let mut oa = obs_avoid();

        let d = oa.decide(25.0, &[]);
        assert_eq!(d.action, ObsAction::Slow);
        assert!((d.speed_factor - 10.0 / 15.0).abs() < 1e-9);

        // Floored at the minimum slow factor
        let d = oa.decide(15.0, &[]);
        assert_eq!(d.action, ObsAction::Slow);
        assert_eq!(d.speed_factor, 0.3);

        // Non-decreasing across the slow band, and always below 1
        let mut prev = 0.0;
        let mut dist = 15.0;
        while dist < 30.0 {
            let f = oa.decide(dist, &[]).speed_factor;
            assert!(f >= 0.3 && f < 1.0);
            assert!(f >= prev);
            prev = f;
            dist += 0.25;
        }
    }

    #[test]
    fn test_clear() {
        let mut oa = obs_avoid();

        for dist in &[30.0, 100.0, 0.0, -1.0, f64::NAN] {
            let d = oa.decide(*dist, &[]);
            assert_eq!(d.action, ObsAction::Clear);
            assert_eq!(d.speed_factor, 1.0);
        }
    }

    #[test]
    fn test_hazard_in_path() {
        let mut oa = obs_avoid();

        let d = oa.decide(100.0, &[person_in_path()]);
        assert_eq!(d.action, ObsAction::Slow);
        assert_eq!(d.speed_factor, 0.5);
        assert!(d.reason.contains("person"));
        assert_eq!(oa.report.hazard_index, Some(0));

        // Sensor timeout falls through to the detections
        let d = oa.decide(-1.0, &[person_in_path()]);
        assert_eq!(d.action, ObsAction::Slow);
        assert!(!oa.report.range_valid);
    }

    #[test]
    fn test_non_hazards() {
        let mut oa = obs_avoid();
        let objects = vec![
            // Low confidence
            object("person", 0.6, [280.0, 100.0, 360.0, 400.0]),
            // Not a hazard label
            object("chair", 0.9, [280.0, 100.0, 360.0, 400.0]),
            // Centre exactly on the band edge, 160 / 640 = 0.25
            object("car", 0.9, [120.0, 100.0, 200.0, 400.0]),
            // Off to the right
            object("dog", 0.9, [560.0, 100.0, 640.0, 400.0]),
        ];

        let d = oa.decide(100.0, &objects);
        assert_eq!(d.action, ObsAction::Clear);
        assert_eq!(oa.report.hazard_index, None);
    }

    #[test]
    fn test_first_hazard_wins() {
        let mut oa = obs_avoid();
        let objects = vec![
            object("chair", 0.9, [280.0, 100.0, 360.0, 400.0]),
            object("bicycle", 0.7, [300.0, 100.0, 340.0, 400.0]),
            person_in_path(),
        ];

        let d = oa.decide(50.0, &objects);
        assert!(d.reason.contains("bicycle"));
        assert_eq!(oa.report.hazard_index, Some(1));
    }

    #[test]
    fn test_plan_avoidance() {
        let oa = obs_avoid();

        assert_eq!(
            oa.plan_avoidance(10.0, -5),
            AvoidancePlan { steer_offset_deg: -45, speed: 0 }
        );
        assert_eq!(
            oa.plan_avoidance(10.0, 0),
            AvoidancePlan { steer_offset_deg: 45, speed: 0 }
        );
        assert_eq!(
            oa.plan_avoidance(20.0, 20),
            AvoidancePlan { steer_offset_deg: 30, speed: 30 }
        );
        assert_eq!(
            oa.plan_avoidance(20.0, -10),
            AvoidancePlan { steer_offset_deg: 5, speed: 30 }
        );
        assert_eq!(
            oa.plan_avoidance(80.0, 12),
            AvoidancePlan { steer_offset_deg: 12, speed: 50 }
        );
        assert_eq!(
            oa.plan_avoidance(-1.0, 12),
            AvoidancePlan { steer_offset_deg: 12, speed: 50 }
        );
    }

    #[test]
    fn test_invalid_params() {
        let mut p = Params::default();
        p.critical_distance_cm = 40.0;
        assert!(matches!(
            ObsAvoid::new(p),
            Err(ObsAvoidError::InvalidDistances(_, _))
        ));

        let mut p = Params::default();
        p.path_band = [0.8, 0.2];
        assert!(ObsAvoid::new(p).is_err());
    }
}
