//! Parameters structure for lane estimation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::HoughParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for lane estimation, loaded from `lane_est.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- VISION ----

    /// Standard deviation of the gaussian blur applied before edge detection.
    ///
    /// Units: pixels
    pub blur_sigma: f32,

    /// Lower hysteresis threshold of the edge detector.
    pub canny_low: f32,

    /// Upper hysteresis threshold of the edge detector.
    pub canny_high: f32,

    /// Top of the region of interest as a fraction of the frame height. Everything above it is
    /// ignored.
    pub roi_top_frac: f64,

    /// Line segment detection.
    pub hough: HoughParams,

    /// Segments with an absolute slope at or below this are discarded as near-horizontal.
    pub min_abs_slope: f64,

    /// Limit on the vision steering offset.
    ///
    /// Units: degrees
    pub max_offset_deg: i32,

    /// Thickness of the lines drawn on the annotated frame.
    ///
    /// Units: pixels
    pub annotate_thickness_px: u32,

    // ---- SENSORS ----

    /// Steering offset applied when the line is under a side sensor.
    ///
    /// Units: degrees
    pub sensor_offset_deg: i32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            roi_top_frac: 2.0 / 3.0,
            hough: HoughParams::default(),
            min_abs_slope: 0.5,
            max_offset_deg: 45,
            annotate_thickness_px: 5,
            sensor_offset_deg: 30,
        }
    }
}
