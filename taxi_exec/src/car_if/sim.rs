//! Simulated car
//!
//! Closes on a single obstacle ahead while driving forwards, the obstacle is moved back out to the
//! starting range once the car gets too close. The camera shows a straight two-line lane which can
//! be shifted sideways.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use log::debug;
use serde::Deserialize;

use super::Car;
use comms_if::eqpt::{
    mech::{DriveDem, MAX_SPEED, STEER_CENTRE_DEG, STEER_MAX_DEG, STEER_MIN_DEG},
    sens::{LinePosition, DISTANCE_TIMEOUT_CM},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Half width of the painted lane lines.
///
/// Units: pixels
const LANE_LINE_HALF_WIDTH_PX: i64 = 3;

const ROAD_COLOUR: Rgb<u8> = Rgb([40, 40, 40]);
const LINE_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);

/// Line sensor readings over the dark line and over the floor.
const LINE_LEVEL: u8 = 0;
const FLOOR_LEVEL: u8 = 200;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the simulated car, loaded from `sim_car.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimCarParams {
    /// Range to the obstacle at startup and after it is moved away.
    ///
    /// Units: centimeters
    pub start_distance_cm: f64,

    /// Range lost per unit of speed on each forward command.
    ///
    /// Units: centimeters
    pub closing_cm_per_speed: f64,

    /// When the range falls below this the obstacle is moved back to the starting range.
    ///
    /// Units: centimeters
    pub reset_distance_cm: f64,

    /// Every Nth range reading times out, 0 to never time out.
    pub timeout_every: u32,

    /// Whether the car has a camera.
    pub camera: bool,

    /// Size of captured frames.
    ///
    /// Units: pixels
    pub frame_width_px: u32,
    pub frame_height_px: u32,

    /// Sideways shift of the rendered lane, positive to the right.
    ///
    /// Units: pixels
    pub lane_shift_px: i32,

    /// Line position reported by the line tracking sensors.
    pub line_position: LinePosition,
}

/// The simulated car.
#[derive(Debug)]
pub struct SimCar {
    params: SimCarParams,

    /// Current range to the obstacle.
    pub distance_cm: f64,

    /// Current drive demand.
    pub drive: DriveDem,

    /// Current steering servo angle.
    pub steer_angle_deg: i32,

    pub camera_centred: bool,
    pub released: bool,

    /// Number of steering commands received, including centring.
    pub num_steer_cmds: u64,

    num_distance_reads: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimCarParams {
    fn default() -> Self {
        Self {
            start_distance_cm: 100.0,
            closing_cm_per_speed: 0.05,
            reset_distance_cm: 8.0,
            timeout_every: 0,
            camera: true,
            frame_width_px: 320,
            frame_height_px: 240,
            lane_shift_px: 0,
            line_position: LinePosition::Centre,
        }
    }
}

impl SimCar {
    pub fn new(params: SimCarParams) -> Self {
        Self {
            distance_cm: params.start_distance_cm,
            drive: DriveDem::Stop,
            steer_angle_deg: STEER_CENTRE_DEG,
            camera_centred: false,
            released: false,
            num_steer_cmds: 0,
            num_distance_reads: 0,
            params,
        }
    }

    pub fn params_mut(&mut self) -> &mut SimCarParams {
        &mut self.params
    }
}

impl Car for SimCar {
    fn forward(&mut self, speed: u8) {
        let speed = speed.min(MAX_SPEED);
        self.drive = DriveDem::Forward(speed);

        self.distance_cm -= speed as f64 * self.params.closing_cm_per_speed;
        if self.distance_cm < self.params.reset_distance_cm {
            debug!("SimCar: obstacle moved away");
            self.distance_cm = self.params.start_distance_cm;
        }
    }

    fn stop(&mut self) {
        self.drive = DriveDem::Stop;
    }

    fn set_steering_angle(&mut self, angle_deg: i32) {
        self.steer_angle_deg = angle_deg.clamp(STEER_MIN_DEG, STEER_MAX_DEG);
        self.num_steer_cmds += 1;
    }

    fn center_camera(&mut self) {
        self.camera_centred = true;
    }

    fn get_distance(&mut self) -> f64 {
        self.num_distance_reads += 1;

        let n = self.params.timeout_every as u64;
        if n > 0 && self.num_distance_reads % n == 0 {
            DISTANCE_TIMEOUT_CM
        } else {
            self.distance_cm
        }
    }

    fn capture_frame(&mut self) -> Option<RgbImage> {
        if !self.params.camera {
            return None;
        }

        Some(render_lane_frame(
            self.params.frame_width_px,
            self.params.frame_height_px,
            self.params.lane_shift_px,
            true,
            true,
        ))
    }

    fn get_line_position(&mut self) -> LinePosition {
        let [left, centre, right] = sensor_levels(self.params.line_position);
        LinePosition::from_sensors(left, centre, right)
    }

    fn release(&mut self) {
        self.drive = DriveDem::Stop;
        self.released = true;
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Grayscale levels the three line sensors would read with the line at `position`.
fn sensor_levels(position: LinePosition) -> [u8; 3] {
    let mut levels = [FLOOR_LEVEL; 3];
    match position {
        LinePosition::Left => levels[0] = LINE_LEVEL,
        LinePosition::Centre => levels[1] = LINE_LEVEL,
        LinePosition::Right => levels[2] = LINE_LEVEL,
        LinePosition::Absent => (),
    }
    levels
}

/// Render a frame of a straight lane seen from the car.
///
/// The lane lines run at 45 degrees across the lower half of the frame and meet the bottom edge an
/// eighth of the frame width in from each side, shifted right by `shift_px`. Either line can be
/// left out.
pub fn render_lane_frame(
    width: u32,
    height: u32,
    shift_px: i32,
    left: bool,
    right: bool,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, ROAD_COLOUR);

    let w = width as i64;
    let h = height as i64;
    let inset = w / 8;

    for y in (h / 2)..h {
        let rise = h - 1 - y;
        let mut centres = Vec::with_capacity(2);
        if left {
            centres.push(inset + rise + shift_px as i64);
        }
        if right {
            centres.push(w - 1 - inset - rise + shift_px as i64);
        }

        for xc in centres {
            let x0 = (xc - LANE_LINE_HALF_WIDTH_PX).max(0);
            let x1 = (xc + LANE_LINE_HALF_WIDTH_PX).min(w - 1);
            for x in x0..=x1 {
                img.put_pixel(x as u32, y as u32, LINE_COLOUR);
            }
        }
    }

    img
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_closing_and_reset() {
        let mut car = SimCar::new(SimCarParams {
            start_distance_cm: 20.0,
            closing_cm_per_speed: 0.1,
            reset_distance_cm: 13.0,
            ..Default::default()
        });

        car.forward(40);
        assert!((car.get_distance() - 16.0).abs() < 1e-9);

        car.forward(40);
        assert!((car.get_distance() - 20.0).abs() < 1e-9);

        car.stop();
        assert_eq!(car.drive, DriveDem::Stop);
    }

    #[test]
    fn test_timeouts() {
        let mut car = SimCar::new(SimCarParams {
            timeout_every: 3,
            ..Default::default()
        });

        let readings: Vec<f64> = (0..6).map(|_| car.get_distance()).collect();
        assert!(readings[0] > 0.0);
        assert!(readings[2] <= 0.0);
        assert!(readings[5] <= 0.0);
    }

    #[test]
    fn test_steering_limits() {
        let mut car = SimCar::new(SimCarParams::default());

        car.set_steering_angle(200);
        assert_eq!(car.steer_angle_deg, STEER_MAX_DEG);
        car.center_steering();
        assert_eq!(car.steer_angle_deg, STEER_CENTRE_DEG);
        assert_eq!(car.num_steer_cmds, 2);
    }

    #[test]
    fn test_line_sensors() {
        assert_eq!(sensor_levels(LinePosition::Left), [LINE_LEVEL, FLOOR_LEVEL, FLOOR_LEVEL]);
        assert_eq!(sensor_levels(LinePosition::Absent), [FLOOR_LEVEL; 3]);

        let mut car = SimCar::new(SimCarParams::default());
        for pos in [
            LinePosition::Left,
            LinePosition::Centre,
            LinePosition::Right,
            LinePosition::Absent,
        ]
        .iter()
        {
            car.params_mut().line_position = *pos;
            assert_eq!(car.get_line_position(), *pos);
        }
    }

    #[test]
    fn test_render_lane() {
        let img = render_lane_frame(320, 240, 0, true, true);

        // Bottom row line centres at 40 and 279
        assert_eq!(*img.get_pixel(40, 239), LINE_COLOUR);
        assert_eq!(*img.get_pixel(279, 239), LINE_COLOUR);
        assert_eq!(*img.get_pixel(160, 239), ROAD_COLOUR);

        // Nothing in the top half
        assert_eq!(*img.get_pixel(159, 10), ROAD_COLOUR);
    }
}
