//! # Taxi Control
//!
//! The control core. Each call to [`TaxiCtrl::tick`] runs one full cycle:
//!
//! 1. Gather detections (draining the network feed and applying the freshness gate).
//! 2. Read the ultrasonic range.
//! 3. Estimate the lane offset from the frame or line sensors.
//! 4. Fuse everything into one drive command.
//! 5. Dispatch the command to the car.
//!
//! Nothing but the last command issued is kept between cycles, so one bad cycle cannot affect the
//! next.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use crate::{
    car_if::Car,
    det_source::DetSource,
    fusion_ctrl::{self, FusionCtrl, FusionCtrlError},
    lane_est::{LaneEstimator, LaneInputs, LaneMode},
    tm::TaxiTm,
};
use comms_if::eqpt::{
    mech::{DriveCmd, DriveDem},
    sens::LinePosition,
};
use util::module::State;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct TaxiCtrl {
    car: Box<dyn Car>,
    det_source: DetSource,
    lane_est: Box<dyn LaneEstimator>,
    fusion_ctrl: FusionCtrl,

    /// Command issued on the previous cycle.
    prev_cmd: DriveCmd,

    released: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TaxiCtrlError {
    #[error("Fusion control error: {0}")]
    FusionError(#[from] FusionCtrlError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TaxiCtrl {
    pub fn new(
        car: Box<dyn Car>,
        det_source: DetSource,
        lane_est: Box<dyn LaneEstimator>,
        fusion_ctrl: FusionCtrl,
    ) -> Self {
        Self {
            car,
            det_source,
            lane_est,
            fusion_ctrl,
            prev_cmd: DriveCmd::stop(),
            released: false,
        }
    }

    /// Point the wheels and camera straight ahead.
    pub fn startup(&mut self) {
        self.car.center_camera();
        self.car.center_steering();
        info!("Steering and camera centred");
    }

    /// Run one control cycle at wall clock time `now_s`.
    pub fn tick(&mut self, cycle: u64, now_s: f64) -> Result<TaxiTm, TaxiCtrlError> {
        // ---- INPUTS ----

        let frame = if self.lane_est.mode() == LaneMode::Vision || self.det_source.needs_frame() {
            self.car.capture_frame()
        } else {
            None
        };

        let budget_s = self.fusion_ctrl.params().staleness_budget_s;
        let det = self.det_source.sample(frame.as_ref(), now_s, budget_s);

        let distance_cm = self.car.get_distance();

        let line_position = match self.lane_est.mode() {
            LaneMode::Sensors => self.car.get_line_position(),
            LaneMode::Vision => LinePosition::Absent,
        };
        let lane_offset_deg = self.lane_est.estimate(&LaneInputs {
            frame: frame.as_ref(),
            line_position,
        });

        // ---- FUSION ----

        let num_objects = det.objects.len();
        let input = fusion_ctrl::InputData {
            objects: det.objects,
            distance_cm,
            lane_offset_deg,
        };
        let (cmd, report) = self.fusion_ctrl.proc(&input)?;

        // ---- DISPATCH ----

        self.dispatch(&cmd);

        if cmd.drive == DriveDem::Stop && self.prev_cmd.drive != DriveDem::Stop {
            warn!("STOPPED: {}", report.decision.reason);
        }
        self.prev_cmd = cmd;

        Ok(TaxiTm {
            cycle,
            time_s: now_s,
            record_age_s: det.record_age_s,
            num_objects,
            num_decoded: det.drain.num_decoded,
            num_malformed: det.drain.num_malformed,
            packet_count: self.det_source.packet_count(),
            distance_cm,
            action: report.decision.action,
            reason: report.decision.reason,
            speed_factor: report.decision.speed_factor,
            lane_offset_deg,
            steer_angle_deg: cmd.steer_angle_deg,
            speed: cmd.speed(),
            avoid_steer_offset_deg: report.avoidance.steer_offset_deg,
            avoid_speed: report.avoidance.speed,
        })
    }

    /// Stop the drive for this cycle, keeping the current steering.
    pub fn fail_safe(&mut self) {
        self.car.stop();
        self.prev_cmd.drive = DriveDem::Stop;
    }

    /// Command a full stop, centre the steering and release the car.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }

        self.car.stop();
        self.car.center_steering();
        self.car.release();
        self.prev_cmd = DriveCmd::stop();
        self.released = true;

        info!("Car stopped and released");
    }

    /// The command issued on the last cycle.
    pub fn prev_cmd(&self) -> DriveCmd {
        self.prev_cmd
    }

    fn dispatch(&mut self, cmd: &DriveCmd) {
        match cmd.drive {
            DriveDem::Stop => self.car.stop(),
            DriveDem::Forward(speed) => self.car.forward(speed),
        }
        self.car.set_steering_angle(cmd.steer_angle_deg);
    }
}

impl Drop for TaxiCtrl {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        car_if::{ObjectDetector, SimCar, SimCarParams},
        det_client::{DetClient, DetReceiver},
        lane_est::{self, build_lane_est},
        obs_avoid::ObsAction,
    };
    use comms_if::{
        eqpt::{
            det::{BBox, DetectedObject},
            mech::STEER_CENTRE_DEG,
        },
        net::NetParams,
    };
    use image::RgbImage;
    use std::{cell::RefCell, net::UdpSocket, rc::Rc, thread, time::Duration};

    /// Records every command sent to an inner simulated car.
    #[derive(Clone)]
    struct SharedCar(Rc<RefCell<SimCar>>);

    impl Car for SharedCar {
        fn forward(&mut self, speed: u8) {
            self.0.borrow_mut().forward(speed)
        }
        fn stop(&mut self) {
            self.0.borrow_mut().stop()
        }
        fn set_steering_angle(&mut self, angle_deg: i32) {
            self.0.borrow_mut().set_steering_angle(angle_deg)
        }
        fn center_camera(&mut self) {
            self.0.borrow_mut().center_camera()
        }
        fn get_distance(&mut self) -> f64 {
            self.0.borrow_mut().get_distance()
        }
        fn capture_frame(&mut self) -> Option<RgbImage> {
            self.0.borrow_mut().capture_frame()
        }
        fn get_line_position(&mut self) -> LinePosition {
            self.0.borrow_mut().get_line_position()
        }
        fn release(&mut self) {
            self.0.borrow_mut().release()
        }
    }

    /// Detector returning a fixed set of objects.
    struct FixedDetector(Vec<DetectedObject>);

    impl ObjectDetector for FixedDetector {
        fn detect_objects(&mut self, _frame: &RgbImage) -> Vec<DetectedObject> {
            self.0.clone()
        }
    }

    fn sim_car(params: SimCarParams) -> (SharedCar, Rc<RefCell<SimCar>>) {
        let inner = Rc::new(RefCell::new(SimCar::new(params)));
        (SharedCar(inner.clone()), inner)
    }

    fn taxi(car: SharedCar, det_source: DetSource, mode: LaneMode) -> TaxiCtrl {
        TaxiCtrl::new(
            Box::new(car),
            det_source,
            build_lane_est(mode, lane_est::Params::default()),
            FusionCtrl::new(fusion_ctrl::Params::default()).unwrap(),
        )
    }

    #[test]
    fn test_clear_road() {
        let (car, inner) = sim_car(SimCarParams {
            start_distance_cm: 200.0,
            closing_cm_per_speed: 0.0,
            line_position: LinePosition::Left,
            ..Default::default()
        });
        let mut ctrl = taxi(car, DetSource::Off, LaneMode::Sensors);

        ctrl.startup();
        assert!(inner.borrow().camera_centred);

        let tm = ctrl.tick(0, 0.0).unwrap();

        assert_eq!(tm.action, ObsAction::Clear);
        assert_eq!(tm.lane_offset_deg, -30);
        assert_eq!(tm.steer_angle_deg, 60);
        assert_eq!(tm.speed, 40);
        assert_eq!(inner.borrow().drive, DriveDem::Forward(40));
        assert_eq!(inner.borrow().steer_angle_deg, 60);
    }

    #[test]
    fn test_stop_then_recover() {
        let (car, inner) = sim_car(SimCarParams {
            start_distance_cm: 10.0,
            closing_cm_per_speed: 0.0,
            reset_distance_cm: 0.0,
            line_position: LinePosition::Right,
            ..Default::default()
        });
        let mut ctrl = taxi(car, DetSource::Off, LaneMode::Sensors);

        let tm = ctrl.tick(0, 0.0).unwrap();
        assert_eq!(tm.action, ObsAction::Stop);
        assert_eq!(tm.speed, 0);
        assert_eq!(inner.borrow().drive, DriveDem::Stop);

        // Steering is still applied while stopped
        assert_eq!(inner.borrow().steer_angle_deg, 120);

        // Avoidance plans a hard turn to the side of the lane offset
        assert_eq!(tm.avoid_steer_offset_deg, 45);
        assert_eq!(tm.avoid_speed, 0);

        // Obstacle gone, the very next tick drives again
        inner.borrow_mut().distance_cm = 100.0;
        let tm = ctrl.tick(1, 0.1).unwrap();
        assert_eq!(tm.action, ObsAction::Clear);
        assert_eq!(inner.borrow().drive, DriveDem::Forward(40));
    }

    #[test]
    fn test_sensor_timeout_falls_back_to_detections() {
        let (car, inner) = sim_car(SimCarParams {
            timeout_every: 1,
            ..Default::default()
        });
        let person = DetectedObject {
            label: String::from("person"),
            score: 0.8,
            bbox: BBox::from([280.0, 100.0, 360.0, 400.0]),
        };
        let mut ctrl = taxi(
            car,
            DetSource::Local(Box::new(FixedDetector(vec![person]))),
            LaneMode::Sensors,
        );

        let tm = ctrl.tick(0, 0.0).unwrap();

        assert!(tm.distance_cm <= 0.0);
        assert_eq!(tm.action, ObsAction::Slow);
        assert_eq!(tm.num_objects, 1);
        assert_eq!(inner.borrow().drive, DriveDem::Forward(20));
    }

    #[test]
    fn test_vision_lane() {
        let (car, inner) = sim_car(SimCarParams {
            start_distance_cm: 200.0,
            closing_cm_per_speed: 0.0,
            ..Default::default()
        });
        let mut ctrl = taxi(car, DetSource::Off, LaneMode::Vision);

        let tm = ctrl.tick(0, 0.0).unwrap();
        assert!(tm.lane_offset_deg.abs() <= 1);

        // No camera, no correction
        inner.borrow_mut().params_mut().camera = false;
        let tm = ctrl.tick(1, 0.1).unwrap();
        assert_eq!(tm.lane_offset_deg, 0);
        assert_eq!(tm.steer_angle_deg, STEER_CENTRE_DEG);
    }

    #[test]
    fn test_udp_detections() {
        let (car, inner) = sim_car(SimCarParams {
            start_distance_cm: 200.0,
            closing_cm_per_speed: 0.0,
            ..Default::default()
        });

        let rx = DetReceiver::new(&NetParams {
            det_endpoint: String::from("127.0.0.1:0"),
            ..Default::default()
        })
        .unwrap();
        let addr = rx.local_addr().unwrap();
        let mut ctrl = taxi(car, DetSource::Udp(DetClient::InLoop(rx)), LaneMode::Sensors);

        let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
        let send = |payloads: &[&str]| {
            for p in payloads {
                tx.send_to(p.as_bytes(), addr).unwrap();
            }
            thread::sleep(Duration::from_millis(50));
        };
        let person = |timestamp: f64| {
            format!(
                r#"{{"timestamp": {}, "objects": [
                    {{"label": "person", "score": 0.8, "bbox": [280, 100, 360, 400]}}
                ]}}"#,
                timestamp
            )
        };

        // Fresh record with a person in the path
        send(&[person(1000.0).as_str()]);
        let tm = ctrl.tick(0, 1000.1).unwrap();
        assert_eq!(tm.action, ObsAction::Slow);
        assert_eq!(tm.num_objects, 1);
        assert_eq!(tm.num_decoded, 1);
        assert_eq!(inner.borrow().drive, DriveDem::Forward(20));

        // Nothing new arrives and the same record goes stale, which is the same as no record
        let budget_s = fusion_ctrl::Params::default().staleness_budget_s;
        let tm = ctrl.tick(1, 1000.0 + budget_s + 0.1).unwrap();
        assert_eq!(tm.action, ObsAction::Clear);
        assert_eq!(tm.num_objects, 0);
        assert!(tm.record_age_s.is_none());
        assert_eq!(inner.borrow().drive, DriveDem::Forward(40));

        // A malformed datagram ahead of a valid one doesn't stop the valid one being used
        send(&[r#"{"objects": ["#, person(2000.0).as_str()]);
        let tm = ctrl.tick(2, 2000.05).unwrap();
        assert_eq!(tm.num_malformed, 1);
        assert_eq!(tm.num_decoded, 1);
        assert_eq!(tm.action, ObsAction::Slow);
        assert!((tm.record_age_s.unwrap() - 0.05).abs() < 1e-6);
        assert_eq!(tm.packet_count, 2);
        assert_eq!(inner.borrow().drive, DriveDem::Forward(20));
    }

    #[test]
    fn test_shutdown() {
        let (car, inner) = sim_car(SimCarParams::default());
        let mut ctrl = taxi(car, DetSource::Off, LaneMode::Sensors);

        ctrl.tick(0, 0.0).unwrap();
        ctrl.shutdown();

        let c = inner.borrow();
        assert_eq!(c.drive, DriveDem::Stop);
        assert_eq!(c.steer_angle_deg, STEER_CENTRE_DEG);
        assert!(c.released);
        assert_eq!(ctrl.prev_cmd(), DriveCmd::stop());
    }

    #[test]
    fn test_release_on_drop() {
        let (car, inner) = sim_car(SimCarParams::default());
        {
            let mut ctrl = taxi(car, DetSource::Off, LaneMode::Sensors);
            ctrl.tick(0, 0.0).unwrap();
        }

        assert!(inner.borrow().released);
    }
}
