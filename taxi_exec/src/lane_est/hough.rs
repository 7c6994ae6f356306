//! Line segment detection
//!
//! Lines are found with the Hough transform from `imageproc`, which only gives infinite lines.
//! Each line, strongest first, claims the unclaimed edge pixels lying close to it. Claimed pixels
//! are split into runs wherever the gap between neighbours exceeds the maximum gap, and runs long
//! enough become segments.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cmp::Ordering;

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for line segment detection.
#[derive(Debug, Clone, Deserialize)]
pub struct HoughParams {
    /// Minimum number of accumulator votes for a line.
    pub vote_threshold: u32,

    /// Radius of the non-maximum suppression applied to the accumulator.
    pub suppression_radius: u32,

    /// Edge pixels closer than this to a line belong to it.
    ///
    /// Units: pixels
    pub line_tolerance_px: f64,

    /// Minimum length of a segment.
    ///
    /// Units: pixels
    pub min_line_len_px: f64,

    /// Largest gap between pixels which are still joined into one segment.
    ///
    /// Units: pixels
    pub max_line_gap_px: f64,

    /// Maximum number of lines visited.
    pub max_lines: usize,
}

/// A line segment between two pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            vote_threshold: 30,
            suppression_radius: 8,
            line_tolerance_px: 2.0,
            min_line_len_px: 40.0,
            max_line_gap_px: 100.0,
            max_lines: 100,
        }
    }
}

impl Segment {
    /// Slope `dy/dx` in image coordinates, `None` for vertical segments.
    ///
    /// Image rows increase downwards, so a line rising to the right has a negative slope.
    pub fn slope(&self) -> Option<f64> {
        if self.x1 == self.x2 {
            None
        } else {
            Some((self.y2 - self.y1) as f64 / (self.x2 - self.x1) as f64)
        }
    }

    pub fn length(&self) -> f64 {
        let dx = (self.x2 - self.x1) as f64;
        let dy = (self.y2 - self.y1) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find line segments in an edge image. Any non-zero pixel is an edge.
pub fn detect_segments(edges: &GrayImage, params: &HoughParams) -> Vec<Segment> {
    let points: Vec<(f64, f64)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .map(|(x, y, _)| (x as f64, y as f64))
        .collect();

    if points.is_empty() {
        return Vec::new();
    }

    let lines = detect_lines(
        edges,
        LineDetectionOptions {
            vote_threshold: params.vote_threshold.max(1),
            suppression_radius: params.suppression_radius,
        },
    );

    // Visit the best supported lines first
    let mut lines: Vec<(usize, PolarLine)> = lines
        .into_iter()
        .map(|l| {
            let support = points
                .iter()
                .filter(|&&p| distance_to(&l, p) <= params.line_tolerance_px)
                .count();
            (support, l)
        })
        .collect();
    lines.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then(a.1.angle_in_degrees.cmp(&b.1.angle_in_degrees))
            .then(a.1.r.partial_cmp(&b.1.r).unwrap_or(Ordering::Equal))
    });
    lines.truncate(params.max_lines);

    let mut claimed = vec![false; points.len()];
    let mut segments = Vec::new();

    for (_, line) in lines {
        let (s, c) = (line.angle_in_degrees as f64).to_radians().sin_cos();

        // Unclaimed pixels on this line, with their position along it
        let mut on_line: Vec<(f64, usize)> = points
            .iter()
            .enumerate()
            .filter(|(i, &p)| !claimed[*i] && distance_to(&line, p) <= params.line_tolerance_px)
            .map(|(i, &(x, y))| (y * c - x * s, i))
            .collect();

        if (on_line.len() as u32) < params.vote_threshold {
            continue;
        }

        on_line.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut start = 0;
        for k in 1..=on_line.len() {
            let run_ends =
                k == on_line.len() || on_line[k].0 - on_line[k - 1].0 > params.max_line_gap_px;
            if !run_ends {
                continue;
            }

            let (pos_0, i_0) = on_line[start];
            let (pos_1, i_1) = on_line[k - 1];
            if pos_1 - pos_0 >= params.min_line_len_px {
                let (x1, y1) = points[i_0];
                let (x2, y2) = points[i_1];
                segments.push(Segment {
                    x1: x1 as i32,
                    y1: y1 as i32,
                    x2: x2 as i32,
                    y2: y2 as i32,
                });
            }

            start = k;
        }

        for (_, i) in on_line {
            claimed[i] = true;
        }
    }

    segments
}

/// Perpendicular distance from a pixel to a line `x cos(t) + y sin(t) = r`.
fn distance_to(line: &PolarLine, (x, y): (f64, f64)) -> f64 {
    let (s, c) = (line.angle_in_degrees as f64).to_radians().sin_cos();
    (x * c + y * s - line.r as f64).abs()
}
