//! Camera based lane estimator
//!
//! Pipeline: grayscale, blur, edge detection, region of interest, segment detection, left/right
//! partition by slope, least squares fit of each side, lane centre and finally the steering
//! offset.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use log::trace;

use super::{
    apply_mask, detect_segments, edge_image, roi_mask, roi_top_row, LaneEstimator, LaneInputs,
    LaneMode, Params, Segment,
};
use util::maths::lin_fit;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const LEFT_LINE_COLOUR: Rgb<u8> = Rgb([0, 0, 255]);
const RIGHT_LINE_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Finds the lane lines in camera frames.
#[derive(Debug, Clone)]
pub struct VisionLaneEst {
    params: Params,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisionLaneEst {
    pub fn new(params: Params) -> Self {
        Self { params }
    }
}

impl LaneEstimator for VisionLaneEst {
    fn mode(&self) -> LaneMode {
        LaneMode::Vision
    }

    fn estimate(&self, inputs: &LaneInputs) -> i32 {
        match inputs.frame {
            Some(frame) => detect_lane(&self.params, frame).0,
            None => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the lane in the frame.
///
/// Returns the steering offset in degrees and a copy of the frame with the fitted left (blue) and
/// right (red) lane lines drawn on it. If no lane lines are found the offset is zero.
pub fn detect_lane(params: &Params, frame: &RgbImage) -> (i32, RgbImage) {
    let (width, height) = frame.dimensions();
    let mut annotated = frame.clone();

    let gray = imageops::grayscale(frame);
    let mut edges = edge_image(&gray, params.blur_sigma, params.canny_low, params.canny_high);

    let roi_top = roi_top_row(height, params.roi_top_frac);
    apply_mask(&mut edges, &roi_mask(width, height, roi_top));

    let segments = detect_segments(&edges, &params.hough);
    if segments.is_empty() {
        return (0, annotated);
    }

    let (left, right) = partition_segments(&segments, params.min_abs_slope);
    trace!(
        "{} segments, {} left, {} right",
        segments.len(),
        left.len(),
        right.len()
    );

    let bottom = height as i32;
    let top = roi_top as i32;
    let left_line = fit_side(&left, bottom, top);
    let right_line = fit_side(&right, bottom, top);

    if let Some(l) = left_line {
        draw_fitted_line(&mut annotated, &l, LEFT_LINE_COLOUR, params.annotate_thickness_px);
    }
    if let Some(r) = right_line {
        draw_fitted_line(&mut annotated, &r, RIGHT_LINE_COLOUR, params.annotate_thickness_px);
    }

    let offset = steering_offset(left_line, right_line, width, params.max_offset_deg);

    (offset, annotated)
}

/// Split segments into left (negative slope) and right (positive slope) candidates.
///
/// Vertical segments and those with `|slope| <= min_abs_slope` are dropped.
pub fn partition_segments(segments: &[Segment], min_abs_slope: f64) -> (Vec<Segment>, Vec<Segment>) {
    let mut left = Vec::new();
    let mut right = Vec::new();

    for seg in segments {
        match seg.slope() {
            Some(m) if m < -min_abs_slope => left.push(*seg),
            Some(m) if m > min_abs_slope => right.push(*seg),
            _ => (),
        }
    }

    (left, right)
}

/// Fit one representative line through all segment end points of one side.
///
/// The fit is `x = a * y + b`, evaluated at the `bottom` and `top` rows. Returns `None` if there
/// are no segments or the fit is degenerate.
pub fn fit_side(segments: &[Segment], bottom: i32, top: i32) -> Option<Segment> {
    if segments.is_empty() {
        return None;
    }

    let mut xs = Vec::with_capacity(segments.len() * 2);
    let mut ys = Vec::with_capacity(segments.len() * 2);
    for s in segments {
        ys.push(s.y1 as f64);
        ys.push(s.y2 as f64);
        xs.push(s.x1 as f64);
        xs.push(s.x2 as f64);
    }

    let (a, b) = lin_fit(&ys, &xs)?;
    if !(a.is_finite() && b.is_finite()) {
        return None;
    }

    Some(Segment {
        x1: (a * bottom as f64 + b) as i32,
        y1: bottom,
        x2: (a * top as f64 + b) as i32,
        y2: top,
    })
}

/// Steering offset from the fitted lane lines.
///
/// The lane centre is midway between the two lines at the bottom of the frame. With a single line
/// the other is assumed to be a quarter of the frame width away. The pixel offset of the centre
/// from the middle of the frame is scaled so that a full frame width is 90 degrees, truncated and
/// clamped to `max_offset_deg`.
pub fn steering_offset(
    left: Option<Segment>,
    right: Option<Segment>,
    width: u32,
    max_offset_deg: i32,
) -> i32 {
    if width == 0 {
        return 0;
    }

    let w = width as i64;
    let centre = match (left, right) {
        (Some(l), Some(r)) => (l.x1 as i64 + r.x1 as i64).div_euclid(2),
        (Some(l), None) => l.x1 as i64 + w / 4,
        (None, Some(r)) => r.x1 as i64 - w / 4,
        (None, None) => return 0,
    };

    let offset_px = centre - w / 2;
    let offset_deg = (offset_px as f64 / w as f64 * 90.0) as i64;

    offset_deg.clamp(-(max_offset_deg as i64), max_offset_deg as i64) as i32
}

/// Draw a fitted lane line. The thickness is made up of parallel lines offset sideways, anything
/// outside the image is clipped.
fn draw_fitted_line(img: &mut RgbImage, line: &Segment, colour: Rgb<u8>, thickness_px: u32) {
    let half = (thickness_px / 2) as i32;

    for dx in -half..=half {
        draw_line_segment_mut(
            img,
            ((line.x1 + dx) as f32, line.y1 as f32),
            ((line.x2 + dx) as f32, line.y2 as f32),
            colour,
        );
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
